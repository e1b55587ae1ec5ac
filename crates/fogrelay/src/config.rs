//! Server configuration.

use serde::{Deserialize, Serialize};

use crate::RelayError;

/// Where and how the relay listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_addr: String,
    /// Prefix of the `master` and `player` endpoints.
    pub base_path: String,
    /// Largest inbound frame accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9837".to_string(),
            base_path: "/api/".to_string(),
            max_message_size: 5_000_000,
        }
    }
}

impl ServerConfig {
    /// Checks that the config can be used to start a server.
    ///
    /// # Errors
    /// Returns `RelayError::InvalidConfig` for an empty bind address or a
    /// zero message size.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.bind_addr.is_empty() {
            return Err(RelayError::InvalidConfig(
                "bind_addr must not be empty".into(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(RelayError::InvalidConfig(
                "max_message_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Adds a leading and a trailing `/` when missing.
///
/// ```
/// assert_eq!(fogrelay::normalize_base_path("api"), "/api/");
/// assert_eq!(fogrelay::normalize_base_path(""), "/");
/// ```
pub fn normalize_base_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 2);
    if !path.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(path);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:9837");
        assert_eq!(config.base_path, "/api/");
        assert_eq!(config.max_message_size, 5_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_message_size() {
        let config = ServerConfig {
            max_message_size: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("/api/"), "/api/");
        assert_eq!(normalize_base_path("api"), "/api/");
        assert_eq!(normalize_base_path("/v2/relay"), "/v2/relay/");
        assert_eq!(normalize_base_path("/"), "/");
    }
}
