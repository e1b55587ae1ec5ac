//! Registry configuration and the room state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RoomError;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room a [`Registry`](crate::Registry)
/// creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How long a room may stay without a published message before it
    /// closes and is forgotten.
    pub expiration: Duration,

    /// How many undelivered messages a player may accumulate before it is
    /// considered unresponsive and evicted.
    pub queue_capacity: usize,

    /// Size of the publisher → room channel. A publisher waits when the
    /// dispatch loop is this many messages behind.
    pub inbound_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            expiration: Duration::from_secs(30 * 60),
            queue_capacity: 5,
            inbound_capacity: 1,
        }
    }
}

impl RegistryConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidConfig`] if the expiration is zero or a
    /// capacity is zero.
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.expiration.is_zero() {
            return Err(RoomError::InvalidConfig(
                "room expiration must be positive".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(RoomError::InvalidConfig(
                "player queue capacity must be positive".into(),
            ));
        }
        if self.inbound_capacity == 0 {
            return Err(RoomError::InvalidConfig(
                "inbound capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Active ──(no message for `expiration`)──→ Closed
///   ↺ message (timer reset + dispatch)
/// ```
///
/// `Closed` is terminal: the publish handle is revoked, every queue is
/// closed, and the room removes itself from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Active,
    Closed,
}

impl RoomState {
    /// Returns `true` if the room still accepts publishers and players.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
