use remora_rpc::ProtocolError;
use thiserror::Error;

/// Failure of a single command issued against the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The daemon already has the torrent that was being added.
    #[error("torrent is already present on the server")]
    DuplicateTorrent,

    /// The daemon rejected the command's arguments.
    #[error("server rejected the command: {reason}")]
    InvalidArgument { reason: String },

    /// The exchange itself failed; the session transitions to the matching
    /// error status alongside this result.
    #[error(transparent)]
    Session(#[from] ProtocolError),

    /// Commands require an established connection.
    #[error("session is not connected")]
    NotConnected,

    /// The session task has shut down.
    #[error("session is closed")]
    Closed,
}
