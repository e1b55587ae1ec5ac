//! The receive side of a room.

use std::sync::Arc;

use fogrelay_protocol::{Message, RoomId};
use tokio_util::sync::CancellationToken;

use crate::mailbox::MailboxReceiver;
use crate::{RelayMetrics, RoomError};

/// A player's bounded inbox.
///
/// Owned by the player's connection task. The room only keeps the sending
/// half; if this queue falls `queue_capacity` messages behind, the room
/// closes it instead of waiting.
///
/// Dropping the queue closes it.
#[derive(Debug)]
pub struct SubscriptionQueue {
    room_id: RoomId,
    inbox: MailboxReceiver<Arc<Message>>,
    metrics: Arc<RelayMetrics>,
}

impl SubscriptionQueue {
    pub(crate) fn new(
        room_id: RoomId,
        inbox: MailboxReceiver<Arc<Message>>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            room_id,
            inbox,
            metrics,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Waits for the next live message.
    ///
    /// # Errors
    /// - [`RoomError::Closed`]: evicted or closed, or the room expired
    /// - [`RoomError::Canceled`]: `cancel` fired first
    pub async fn receive(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Arc<Message>, RoomError> {
        Ok(self.inbox.recv(cancel).await?)
    }

    /// Closes the queue. Safe to call any number of times, from any task,
    /// concurrently with the room evicting it.
    ///
    /// Messages still buffered are released on the next
    /// [`receive`](Self::receive) or when the queue is dropped.
    pub fn close(&self) {
        if self.inbox.close() {
            self.metrics.closed_queues.inc();
            tracing::debug!(room_id = %self.room_id, "subscription closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    /// Messages delivered but not yet received.
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

impl Drop for SubscriptionQueue {
    fn drop(&mut self) {
        self.close();
    }
}
