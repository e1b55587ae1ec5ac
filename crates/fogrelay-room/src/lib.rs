//! Room lifecycle, fan-out, and expiry for fogrelay.
//!
//! A room relays messages from one game master to any number of players.
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! dispatch loop and the inactivity timer; everything else talks to it
//! through handles.
//!
//! # Key types
//!
//! - [`Registry`] — issues ids and secrets, authorizes publishers, finds rooms
//! - [`PublishHandle`] — the single active publisher of a room
//! - [`SubscriptionQueue`] — a player's bounded inbox with blocking receive
//! - [`mailbox`] — the try-deliver-or-evict queue behind every subscription
//! - [`RegistryConfig`] — expiration and queue sizes
//! - [`RelayMetrics`] — counters passed in at construction

mod config;
mod error;
mod ids;
pub mod mailbox;
mod metrics;
mod publisher;
mod registry;
mod room;
mod subscription;

pub use config::{RegistryConfig, RoomState};
pub use error::RoomError;
pub use ids::{generate_room_id, generate_secret, room_id_at, ID_ALPHABET};
pub use metrics::{Gauge, RelayMetrics};
pub use publisher::PublishHandle;
pub use registry::Registry;
pub use room::RoomInfo;
pub use subscription::SubscriptionQueue;

/// The replay snapshot handed to a new subscriber: the last message of
/// every category, in no particular order.
pub type Replay = Vec<std::sync::Arc<fogrelay_protocol::Message>>;
