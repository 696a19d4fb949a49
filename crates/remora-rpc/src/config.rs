//! Connection target description supplied by the caller's settings layer.
//!
//! A `ServerConfig` is immutable for the lifetime of a session; changing any
//! field requires tearing the session down and creating a new one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default RPC endpoint path exposed by the daemon.
pub const DEFAULT_API_PATH: &str = "/transmission/rpc";

const DEFAULT_PORT: u16 = 9091;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_BACKGROUND_POLL_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Basic-auth credentials for daemons with RPC authentication enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A local ↔ remote directory pair for servers whose download locations are
/// also mounted on the client machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountMapping {
    /// Directory as seen on the client.
    pub local: String,
    /// Directory as reported by the daemon.
    pub remote: String,
}

/// Everything needed to reach one daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Daemon host name or address.
    pub host: String,
    /// Daemon RPC port.
    pub port: u16,
    /// RPC endpoint path, usually [`DEFAULT_API_PATH`].
    pub api_path: String,
    /// Whether to connect over HTTPS.
    pub https: bool,
    /// PEM-encoded certificate to trust for this server only, for daemons
    /// behind a self-signed certificate.
    pub trusted_certificate: Option<String>,
    /// PEM-encoded client certificate and private key presented to the
    /// server during the TLS handshake.
    pub client_certificate: Option<String>,
    /// Optional basic-auth credentials.
    pub credentials: Option<Credentials>,
    /// Poll period while the caller's UI is active.
    pub poll_interval: Duration,
    /// Poll period while the caller's UI is backgrounded.
    pub background_poll_interval: Duration,
    /// Per-request timeout enforced by the transport.
    pub timeout: Duration,
    /// Directory mappings used to translate daemon paths to local ones.
    pub mounted_directories: Vec<MountMapping>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            api_path: DEFAULT_API_PATH.to_string(),
            https: false,
            trusted_certificate: None,
            client_certificate: None,
            credentials: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            background_poll_interval: DEFAULT_BACKGROUND_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            mounted_directories: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Check the configuration for values the transport cannot work with.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.poll_interval.is_zero()
            || self.background_poll_interval.is_zero()
            || self.timeout.is_zero()
        {
            return Err(ConfigError::ZeroDuration);
        }
        Ok(())
    }

    /// Full RPC endpoint URL for this server.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        let path = if self.api_path.starts_with('/') {
            self.api_path.clone()
        } else {
            format!("/{}", self.api_path)
        };
        format!("{scheme}://{}:{}{path}", self.host, self.port)
    }

    /// Translate a daemon-side path into its local mount, if one is mapped.
    #[must_use]
    pub fn remote_to_local(&self, remote_path: &str) -> Option<String> {
        self.mounted_directories.iter().find_map(|mapping| {
            join_mapped(remote_path, &mapping.remote, &mapping.local)
        })
    }

    /// Translate a local path into the daemon-side directory, if mapped.
    #[must_use]
    pub fn local_to_remote(&self, local_path: &str) -> Option<String> {
        self.mounted_directories.iter().find_map(|mapping| {
            join_mapped(local_path, &mapping.local, &mapping.remote)
        })
    }
}

fn join_mapped(path: &str, from: &str, to: &str) -> Option<String> {
    let from = from.trim_end_matches('/');
    let rest = path.strip_prefix(from)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        // Prefix match fell inside a path component ("/data2" vs "/data").
        return None;
    }
    Some(format!("{}{rest}", to.trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_combines_scheme_host_port_and_path() {
        let config = ServerConfig {
            host: "seedbox.example".into(),
            port: 443,
            https: true,
            ..ServerConfig::default()
        };
        assert_eq!(config.url(), "https://seedbox.example:443/transmission/rpc");
    }

    #[test]
    fn url_normalizes_missing_leading_slash() {
        let config = ServerConfig {
            api_path: "rpc".into(),
            ..ServerConfig::default()
        };
        assert_eq!(config.url(), "http://localhost:9091/rpc");
    }

    #[test]
    fn validate_rejects_empty_host_and_zero_port() {
        let mut config = ServerConfig {
            host: "  ".into(),
            ..ServerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyHost));

        config.host = "localhost".into();
        config.port = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPort));

        config.port = 9091;
        config.poll_interval = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration));
    }

    #[test]
    fn mount_mappings_translate_both_directions() {
        let config = ServerConfig {
            mounted_directories: vec![MountMapping {
                local: "/mnt/seedbox".into(),
                remote: "/home/user/downloads".into(),
            }],
            ..ServerConfig::default()
        };

        assert_eq!(
            config.remote_to_local("/home/user/downloads/linux.iso"),
            Some("/mnt/seedbox/linux.iso".to_string())
        );
        assert_eq!(
            config.local_to_remote("/mnt/seedbox/linux.iso"),
            Some("/home/user/downloads/linux.iso".to_string())
        );
        assert_eq!(config.remote_to_local("/elsewhere/linux.iso"), None);
    }

    #[test]
    fn mount_mapping_does_not_match_partial_components() {
        let config = ServerConfig {
            mounted_directories: vec![MountMapping {
                local: "/mnt/a".into(),
                remote: "/data".into(),
            }],
            ..ServerConfig::default()
        };
        assert_eq!(config.remote_to_local("/data2/file"), None);
        assert_eq!(
            config.remote_to_local("/data/file"),
            Some("/mnt/a/file".to_string())
        );
    }
}
