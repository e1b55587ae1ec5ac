//! # fogrelay
//!
//! A WebSocket relay between one game master and the players watching
//! their room.
//!
//! The game master connects to `<base>/master`, receives a room id and a
//! secret, and streams `{"content", "data"}` messages. Players connect to
//! `<base>/player?id=<room id>`, receive the last message of every
//! category, then every new message live. Rooms expire after a period of
//! inactivity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fogrelay::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .bind("0.0.0.0:9837")
//!     .base_path("/api/")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;
mod stats;

pub use config::{normalize_base_path, ServerConfig};
pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};
pub use stats::{ServerStats, Statistics, StatsReporter};

/// Re-exports of the types needed to run and observe a relay.
pub mod prelude {
    pub use crate::{
        RelayError, RelayServer, RelayServerBuilder, ServerConfig,
        ServerStats, Statistics, StatsReporter,
    };
    pub use fogrelay_protocol::{ControlFrame, Message, RoomId};
    pub use fogrelay_room::{
        PublishHandle, Registry, RegistryConfig, RelayMetrics, RoomError,
        SubscriptionQueue,
    };
}
