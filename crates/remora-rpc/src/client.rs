//! Session protocol client: frames domain requests into the daemon's RPC
//! envelope, runs the session-token rotation handshake, and classifies
//! responses into the protocol error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::{ProtocolError, TransportError};
use crate::transport::{HttpReply, HttpTransport, RpcTransport};

/// RPC protocol version implemented by this client.
pub const RPC_VERSION: i64 = 17;
/// Oldest daemon RPC version this client accepts.
pub const MINIMUM_RPC_VERSION: i64 = 14;

const RESULT_SUCCESS: &str = "success";

#[derive(Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    arguments: &'a Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

/// Daemon identity established by the handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    /// RPC version the daemon speaks.
    pub rpc_version: i64,
    /// Oldest RPC version the daemon still accepts from clients.
    pub minimum_rpc_version: i64,
    /// Human-readable daemon version string.
    pub server_version: Option<String>,
    /// Default download directory configured on the daemon.
    pub download_dir: Option<String>,
    /// Full `session-get` arguments for callers that need other settings.
    pub arguments: Value,
}

/// Client for one daemon connection. Owns the rotating session token.
pub struct RpcClient {
    transport: Box<dyn RpcTransport>,
    session_id: Option<String>,
}

impl RpcClient {
    /// Build a client backed by a real HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the transport cannot be built from
    /// `config` (malformed certificates, invalid URL).
    pub fn new(config: &ServerConfig) -> Result<Self, TransportError> {
        Ok(Self::with_transport(Box::new(HttpTransport::new(config)?)))
    }

    /// Build a client over an arbitrary transport; used by tests to script
    /// daemon behaviour.
    #[must_use]
    pub fn with_transport(transport: Box<dyn RpcTransport>) -> Self {
        Self {
            transport,
            session_id: None,
        }
    }

    /// Currently held session token, if any exchange has produced one.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Issue one RPC call and return the response `arguments` object.
    ///
    /// A stale-token reply (HTTP 409) is retried exactly once with the
    /// freshly supplied token; a second 409 surfaces as an authentication
    /// failure rather than looping.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] classifying the failure.
    pub async fn call(&mut self, method: &str, arguments: Value) -> Result<Value, ProtocolError> {
        let body = serde_json::to_string(&RpcRequest {
            method,
            arguments: &arguments,
        })
        .map_err(|err| ProtocolError::Parse {
            reason: format!("failed to encode {method} request: {err}"),
        })?;

        let mut reply = self
            .transport
            .send(body.clone(), self.session_id.as_deref())
            .await?;

        if reply.status == 409 {
            if let Some(token) = reply.session_id.take() {
                debug!(method, "session token rotated");
                self.session_id = Some(token);
            }
            reply = self
                .transport
                .send(body, self.session_id.as_deref())
                .await?;
            if reply.status == 409 {
                warn!(method, "session token rejected twice");
                return Err(ProtocolError::Authentication);
            }
        }

        self.interpret(method, reply)
    }

    /// Perform the first-connect handshake: fetch `session-get` and verify
    /// the daemon's RPC version against the supported range.
    ///
    /// # Errors
    ///
    /// Returns `ServerTooOld`/`ServerTooNew` on a version mismatch, or any
    /// classified failure from the underlying call.
    pub async fn handshake(&mut self) -> Result<SessionInfo, ProtocolError> {
        let arguments = self.call("session-get", Value::Object(Default::default())).await?;

        let rpc_version = arguments
            .get("rpc-version")
            .and_then(Value::as_i64)
            .ok_or_else(|| ProtocolError::Parse {
                reason: "session-get response is missing rpc-version".to_string(),
            })?;
        let minimum_rpc_version = arguments
            .get("rpc-version-minimum")
            .and_then(Value::as_i64)
            .unwrap_or(rpc_version);

        if rpc_version < MINIMUM_RPC_VERSION {
            return Err(ProtocolError::ServerTooOld {
                version: rpc_version,
                minimum: MINIMUM_RPC_VERSION,
            });
        }
        if minimum_rpc_version > RPC_VERSION {
            return Err(ProtocolError::ServerTooNew {
                version: minimum_rpc_version,
                supported: RPC_VERSION,
            });
        }

        let server_version = arguments
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let download_dir = arguments
            .get("download-dir")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(SessionInfo {
            rpc_version,
            minimum_rpc_version,
            server_version,
            download_dir,
            arguments,
        })
    }

    fn interpret(&mut self, method: &str, mut reply: HttpReply) -> Result<Value, ProtocolError> {
        if let Some(token) = reply.session_id.take() {
            self.session_id = Some(token);
        }

        match reply.status {
            401 | 403 => Err(ProtocolError::Authentication),
            status if !reply.is_success() => Err(TransportError::Io {
                reason: format!("{method} returned HTTP {status}"),
            }
            .into()),
            _ => {
                let response: RpcResponse =
                    serde_json::from_slice(&reply.body).map_err(|err| ProtocolError::Parse {
                        reason: format!("{method} response is not a valid envelope: {err}"),
                    })?;
                if response.result == RESULT_SUCCESS {
                    Ok(response.arguments)
                } else {
                    Err(ProtocolError::Rejected {
                        message: response.result,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SESSION_ID_HEADER;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config_for(server: &MockServer) -> ServerConfig {
        ServerConfig {
            host: server.host(),
            port: server.port(),
            ..ServerConfig::default()
        }
    }

    fn client_for(server: &MockServer) -> RpcClient {
        RpcClient::new(&config_for(server)).expect("client should build")
    }

    #[tokio::test]
    async fn call_returns_arguments_on_success() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/transmission/rpc")
                .json_body_includes(r#"{"method":"session-stats"}"#);
            then.status(200)
                .json_body(json!({"result": "success", "arguments": {"torrentCount": 3}}));
        });

        let mut client = client_for(&server);
        let arguments = client
            .call("session-stats", json!({}))
            .await
            .expect("call should succeed");
        assert_eq!(arguments["torrentCount"], 3);
    }

    #[tokio::test]
    async fn stale_token_is_retried_once_with_fresh_token() {
        let server = MockServer::start_async().await;
        let ok = server.mock(|when, then| {
            when.method(POST)
                .path("/transmission/rpc")
                .header(SESSION_ID_HEADER, "fresh-token");
            then.status(200)
                .json_body(json!({"result": "success", "arguments": {}}));
        });
        let stale = server.mock(|when, then| {
            when.method(POST)
                .path("/transmission/rpc")
                .header_missing(SESSION_ID_HEADER);
            then.status(409).header(SESSION_ID_HEADER, "fresh-token");
        });

        let mut client = client_for(&server);
        client
            .call("torrent-get", json!({"fields": ["id"]}))
            .await
            .expect("rotation should recover");
        assert_eq!(client.session_id(), Some("fresh-token"));

        // The remembered token is reused; the stale path is never hit again.
        client
            .call("torrent-get", json!({"fields": ["id"]}))
            .await
            .expect("second call should reuse the token");
        stale.assert_hits(1);
        ok.assert_hits(2);
    }

    #[tokio::test]
    async fn second_stale_token_reply_surfaces_authentication_error() {
        let server = MockServer::start_async().await;
        let stale = server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(409).header(SESSION_ID_HEADER, "ignored");
        });

        let mut client = client_for(&server);
        let err = client
            .call("session-get", json!({}))
            .await
            .expect_err("repeated 409 should fail");
        assert_eq!(err, ProtocolError::Authentication);
        // Retried exactly once, never indefinitely.
        stale.assert_hits(2);
    }

    #[tokio::test]
    async fn rejected_credentials_classify_as_authentication() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(401);
        });

        let mut client = client_for(&server);
        let err = client.call("session-get", json!({})).await.unwrap_err();
        assert_eq!(err, ProtocolError::Authentication);
    }

    #[tokio::test]
    async fn daemon_result_string_surfaces_as_rejection() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(200)
                .json_body(json!({"result": "duplicate torrent", "arguments": {}}));
        });

        let mut client = client_for(&server);
        match client.call("torrent-add", json!({})).await {
            Err(ProtocolError::Rejected { message }) => assert_eq!(message, "duplicate torrent"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_envelope_classifies_as_parse_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(200).body("<html>not json</html>");
        });

        let mut client = client_for(&server);
        match client.call("session-get", json!({})).await {
            Err(ProtocolError::Parse { .. }) => {}
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handshake_accepts_supported_version_range() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/transmission/rpc")
                .json_body_includes(r#"{"method":"session-get"}"#);
            then.status(200).json_body(json!({
                "result": "success",
                "arguments": {
                    "rpc-version": 17,
                    "rpc-version-minimum": 14,
                    "version": "4.0.5",
                    "download-dir": "/downloads"
                }
            }));
        });

        let mut client = client_for(&server);
        let info = client.handshake().await.expect("handshake should succeed");
        assert_eq!(info.rpc_version, 17);
        assert_eq!(info.server_version.as_deref(), Some("4.0.5"));
        assert_eq!(info.download_dir.as_deref(), Some("/downloads"));
    }

    #[tokio::test]
    async fn handshake_rejects_versions_outside_range() {
        let server = MockServer::start_async().await;
        let mut mock = server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(200).json_body(
                json!({"result": "success", "arguments": {"rpc-version": 13, "rpc-version-minimum": 13}}),
            );
        });

        let mut client = client_for(&server);
        match client.handshake().await {
            Err(ProtocolError::ServerTooOld { version, .. }) => assert_eq!(version, 13),
            other => panic!("expected server-too-old, got {other:?}"),
        }

        mock.delete();
        server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(200).json_body(
                json!({"result": "success", "arguments": {"rpc-version": 99, "rpc-version-minimum": 98}}),
            );
        });

        match client.handshake().await {
            Err(ProtocolError::ServerTooNew { version, .. }) => assert_eq!(version, 98),
            other => panic!("expected server-too-new, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handshake_without_version_field_is_a_parse_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(200)
                .json_body(json!({"result": "success", "arguments": {"version": "4.0.5"}}));
        });

        let mut client = client_for(&server);
        match client.handshake().await {
            Err(ProtocolError::Parse { reason }) => assert!(reason.contains("rpc-version")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
