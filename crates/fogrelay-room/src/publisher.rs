//! The publish side of a room.

use std::fmt;
use std::sync::Arc;

use fogrelay_protocol::{Message, RoomId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::RoomError;

/// The capability to publish into one room.
///
/// A room has exactly one active handle. Asking the
/// [`Registry`](crate::Registry) for a new one (with the right secret)
/// revokes the previous handle, so a game master reopening the page in a
/// new tab takes over from the old tab.
///
/// The handle is revoked by a child token of the room's closed signal:
/// revocation by replacement cancels the child, room expiry cancels the
/// parent, and either way `submit` fails with [`RoomError::Closed`].
pub struct PublishHandle {
    room_id: RoomId,
    secret: String,
    inbound: mpsc::Sender<Arc<Message>>,
    revoked: CancellationToken,
}

impl PublishHandle {
    pub(crate) fn new(
        room_id: RoomId,
        secret: String,
        inbound: mpsc::Sender<Arc<Message>>,
        revoked: CancellationToken,
    ) -> Self {
        Self {
            room_id,
            secret,
            inbound,
            revoked,
        }
    }

    /// The id of the room this handle publishes to.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// The room secret, to be handed back to the game master.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Submits a message to the room's dispatch loop.
    ///
    /// Waits only while the room's inbound channel is full. If `cancel`
    /// fires first the message is discarded, never partially dispatched.
    ///
    /// # Errors
    /// - [`RoomError::Closed`] — the handle was replaced or the room expired
    /// - [`RoomError::Canceled`] — `cancel` fired before the message was queued
    pub async fn submit(
        &self,
        msg: Message,
        cancel: &CancellationToken,
    ) -> Result<(), RoomError> {
        if self.revoked.is_cancelled() {
            return Err(RoomError::Closed);
        }
        let msg = Arc::new(msg);
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RoomError::Canceled),
            () = self.revoked.cancelled() => Err(RoomError::Closed),
            sent = self.inbound.send(msg) => sent.map_err(|_| RoomError::Closed),
        }
    }

    /// Revokes the handle. Idempotent.
    pub fn close(&self) {
        self.revoked.cancel();
    }

    /// Returns `true` once the handle was replaced, closed, or its room expired.
    pub fn is_closed(&self) -> bool {
        self.revoked.is_cancelled()
    }

    /// Resolves when the handle stops being usable.
    pub async fn closed(&self) {
        self.revoked.cancelled().await;
    }
}

impl fmt::Debug for PublishHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishHandle")
            .field("room_id", &self.room_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
