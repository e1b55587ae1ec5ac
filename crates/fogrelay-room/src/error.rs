//! Error types for the room layer.

use fogrelay_protocol::RoomId;

use crate::mailbox::MailboxError;

/// Errors that can occur during room operations.
///
/// Every variant is returned to the caller of the failing operation.
/// Delivery failures to individual subscribers are never surfaced here:
/// a slow subscriber is evicted, not reported to the publisher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The secret doesn't match the room's secret. Nothing was changed.
    #[error("unauthorized")]
    Unauthorized,

    /// No room with this id exists.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A freshly generated room id collided with a live room.
    /// The caller may retry the whole call.
    #[error("server overloaded")]
    Overloaded,

    /// The handle was revoked, the queue was evicted, or the room expired.
    #[error("connection closed")]
    Closed,

    /// The caller's cancellation token fired while waiting.
    #[error("operation canceled")]
    Canceled,

    /// The registry configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<MailboxError> for RoomError {
    fn from(err: MailboxError) -> Self {
        match err {
            MailboxError::Closed => Self::Closed,
            MailboxError::Canceled => Self::Canceled,
        }
    }
}
