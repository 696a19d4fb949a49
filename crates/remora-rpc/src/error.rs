//! Error taxonomy for the transport and protocol layers.

use thiserror::Error;

/// Failures raised by the HTTP transport, before any protocol
/// interpretation of the response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// The server refused the connection or could not be reached.
    #[error("server is unreachable")]
    Unreachable,
    /// Certificate validation or the TLS handshake failed.
    #[error("TLS validation failed: {reason}")]
    Tls {
        /// Underlying failure description.
        reason: String,
    },
    /// Any other network I/O failure.
    #[error("network I/O failed: {reason}")]
    Io {
        /// Underlying failure description.
        reason: String,
    },
}

/// Failures raised while speaking the daemon's RPC envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The transport layer failed before a response was interpreted.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The daemon rejected the supplied credentials, or the session token
    /// handshake failed twice in a row.
    #[error("server rejected the supplied credentials")]
    Authentication,
    /// The response payload was not well-formed for the expected shape.
    #[error("malformed response: {reason}")]
    Parse {
        /// What failed to parse.
        reason: String,
    },
    /// The daemon requires an RPC version newer than this client implements.
    #[error("server requires RPC version {version}, client implements {supported}")]
    ServerTooNew {
        /// Minimum version advertised by the daemon.
        version: i64,
        /// Version implemented by this client.
        supported: i64,
    },
    /// The daemon speaks an RPC version older than this client supports.
    #[error("server RPC version {version} is older than the supported minimum {minimum}")]
    ServerTooOld {
        /// Version advertised by the daemon.
        version: i64,
        /// Oldest version this client accepts.
        minimum: i64,
    },
    /// The daemon answered the envelope but refused the request; the
    /// message is the daemon's own `result` string (for example
    /// `"duplicate torrent"`).
    #[error("server rejected request: {message}")]
    Rejected {
        /// Daemon-supplied failure string.
        message: String,
    },
}

/// Failures raised while assembling a [`crate::ServerConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The server host was empty.
    #[error("server host must not be empty")]
    EmptyHost,
    /// The server port was zero.
    #[error("server port must not be zero")]
    ZeroPort,
    /// A poll interval or the request timeout was zero.
    #[error("intervals and timeout must be non-zero")]
    ZeroDuration,
}
