//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: transport → protocol → room registry.

use std::sync::Arc;

use fogrelay_protocol::{Codec, JsonCodec};
use fogrelay_room::{Registry, RegistryConfig};
use fogrelay_transport::{Incoming, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::stats::{ServerStats, StatsReporter};
use crate::{normalize_base_path, RelayError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The registry
/// does its own locking, so nothing here needs a mutex.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Registry,
    pub(crate) codec: C,
    pub(crate) stats: Arc<ServerStats>,
    /// Normalized, with leading and trailing `/`.
    pub(crate) base_path: String,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,ignore
/// let server = RelayServer::builder()
///     .bind("127.0.0.1:9837")
///     .registry_config(RegistryConfig {
///         queue_capacity: 10,
///         ..RegistryConfig::default()
///     })
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Clone, Default)]
pub struct RelayServerBuilder {
    config: ServerConfig,
    registry_config: RegistryConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the prefix of the `master` and `player` endpoints.
    pub fn base_path(mut self, path: &str) -> Self {
        self.config.base_path = path.to_string();
        self
    }

    /// Sets the largest inbound frame accepted, in bytes.
    pub fn max_message_size(mut self, limit: usize) -> Self {
        self.config.max_message_size = limit;
        self
    }

    /// Sets room expiration and queue sizes.
    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    /// Validates the configuration and binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// Fails on invalid configuration or if the address cannot be bound.
    pub async fn build(self) -> Result<RelayServer<JsonCodec>, RelayError> {
        self.config.validate()?;
        let registry = Registry::new(self.registry_config)?;

        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_max_message_size(self.config.max_message_size);

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            stats: Arc::new(ServerStats::new()),
            base_path: normalize_base_path(&self.config.base_path),
        });

        Ok(RelayServer { transport, state })
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl RelayServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<C: Codec> RelayServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room registry behind this server.
    pub fn registry(&self) -> &Registry {
        &self.state.registry
    }

    /// A handle for reading counters while the server runs.
    pub fn stats(&self) -> StatsReporter {
        StatsReporter::new(
            self.state.registry.clone(),
            Arc::clone(&self.state.stats),
        )
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a task per accepted socket; the WebSocket handshake and the
    /// handler both run inside that task. Runs until the process is
    /// terminated or the future is dropped; a failed accept is logged and
    /// does not stop the loop.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            base_path = %self.state.base_path,
            "relay server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let peer = incoming.peer_addr();
                        let conn = match incoming.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(
                                    %peer,
                                    error = %e,
                                    "handshake failed"
                                );
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

impl<C: Codec> std::fmt::Debug for RelayServer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("local_addr", &self.transport.local_addr().ok())
            .field("base_path", &self.state.base_path)
            .field("registry", &self.state.registry)
            .finish()
    }
}
