//! Transport and protocol client for the daemon's JSON/HTTP RPC service.
//!
//! The crate is split the way the wire works: [`transport`] moves opaque
//! request/response bodies over HTTP(S) with the configured trust and
//! credentials, while [`client`] speaks the RPC envelope on top of it —
//! session-token rotation, version handshake, and classification of every
//! failure into [`ProtocolError`].

pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use client::{MINIMUM_RPC_VERSION, RPC_VERSION, RpcClient, SessionInfo};
pub use config::{Credentials, MountMapping, ServerConfig, DEFAULT_API_PATH};
pub use error::{ConfigError, ProtocolError, TransportError};
pub use transport::{HttpReply, HttpTransport, RpcTransport, SESSION_ID_HEADER};
