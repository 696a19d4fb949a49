//! Low-level HTTP exchange with the daemon.
//!
//! One [`HttpTransport`] is built per session from the immutable
//! [`ServerConfig`]; it owns the single reqwest client carrying TLS trust,
//! client identity, basic auth, and the per-request timeout.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Client, Identity, StatusCode, Url};

use crate::config::ServerConfig;
use crate::error::TransportError;

/// Header carrying the rotating session token.
pub const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Raw response handed back to the protocol layer.
#[derive(Debug, Clone)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Session token supplied by the daemon, when present.
    pub session_id: Option<String>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpReply {
    /// Whether the status code is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Seam between the protocol client and the network, so tests can script
/// daemon behaviour without a socket.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Post one RPC envelope and return the raw reply.
    async fn send(
        &self,
        body: String,
        session_id: Option<&str>,
    ) -> Result<HttpReply, TransportError>;
}

/// reqwest-backed transport used outside of tests.
#[derive(Debug)]
pub struct HttpTransport {
    http: Client,
    url: Url,
    credentials: Option<(String, String)>,
}

impl HttpTransport {
    /// Build the HTTP client described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the supplied certificates are not
    /// valid PEM or the client cannot be constructed.
    pub fn new(config: &ServerConfig) -> Result<Self, TransportError> {
        let url = Url::parse(&config.url()).map_err(|err| TransportError::Io {
            reason: format!("invalid server URL: {err}"),
        })?;

        let mut builder = Client::builder().timeout(config.timeout);

        if let Some(pem) = &config.trusted_certificate {
            let certificate =
                Certificate::from_pem(pem.as_bytes()).map_err(|err| TransportError::Tls {
                    reason: format!("trusted certificate is not valid PEM: {err}"),
                })?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(pem) = &config.client_certificate {
            let identity =
                Identity::from_pem(pem.as_bytes()).map_err(|err| TransportError::Tls {
                    reason: format!("client certificate is not valid PEM: {err}"),
                })?;
            builder = builder.identity(identity);
        }

        let http = builder.build().map_err(|err| TransportError::Io {
            reason: format!("failed to build HTTP client: {err}"),
        })?;

        let credentials = config
            .credentials
            .as_ref()
            .map(|creds| (creds.username.clone(), creds.password.clone()));

        Ok(Self {
            http,
            url,
            credentials,
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(
        &self,
        body: String,
        session_id: Option<&str>,
    ) -> Result<HttpReply, TransportError> {
        let mut request = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }
        if let Some(token) = session_id {
            request = request.header(SESSION_ID_HEADER, token);
        }

        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status: StatusCode = response.status();
        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(classify_reqwest_error)?
            .to_vec();

        Ok(HttpReply {
            status: status.as_u16(),
            session_id,
            body,
        })
    }
}

/// Map a reqwest failure onto the transport taxonomy.
fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    let reason = source_chain(&err);
    if is_tls_failure(&reason) {
        return TransportError::Tls { reason };
    }
    if err.is_connect() {
        return TransportError::Unreachable;
    }
    TransportError::Io { reason }
}

/// Flatten an error and its sources into one description, deepest last.
fn source_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

fn is_tls_failure(description: &str) -> bool {
    let lowered = description.to_ascii_lowercase();
    lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("handshake")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_failures_are_recognized_by_description() {
        assert!(is_tls_failure("invalid peer certificate: UnknownIssuer"));
        assert!(is_tls_failure("TLS handshake failed"));
        assert!(!is_tls_failure("connection refused"));
    }

    #[test]
    fn reply_success_covers_2xx_only() {
        let reply = |status| HttpReply {
            status,
            session_id: None,
            body: Vec::new(),
        };
        assert!(reply(200).is_success());
        assert!(reply(204).is_success());
        assert!(!reply(409).is_success());
        assert!(!reply(500).is_success());
    }

    #[test]
    fn transport_rejects_malformed_trusted_certificate() {
        let config = ServerConfig {
            trusted_certificate: Some("not a certificate".into()),
            ..ServerConfig::default()
        };
        match HttpTransport::new(&config) {
            Err(TransportError::Tls { .. }) => {}
            other => panic!("expected TLS error, got {other:?}"),
        }
    }
}
