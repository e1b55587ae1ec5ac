use std::time::Duration;

use anyhow::{Context, Result};
use fogrelay::prelude::{RegistryConfig, ServerConfig};

/// Relay configuration sourced from environment variables, falling back
/// to the library defaults.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(listen) = lookup("FOGRELAY_LISTEN") {
            config.server.bind_addr = listen;
        }
        if let Some(base_path) = lookup("FOGRELAY_BASE_PATH") {
            config.server.base_path = base_path;
        }
        if let Some(secs) = lookup("FOGRELAY_ROOM_EXPIRATION_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| "parse FOGRELAY_ROOM_EXPIRATION_SECS")?;
            config.registry.expiration = Duration::from_secs(secs);
        }
        if let Some(queue) = lookup("FOGRELAY_PLAYER_QUEUE") {
            config.registry.queue_capacity = queue
                .parse()
                .with_context(|| "parse FOGRELAY_PLAYER_QUEUE")?;
        }
        Ok(config)
    }
}
