//! Room actor: an isolated Tokio task that relays one game master's
//! messages to its players.
//!
//! The task owns the inbound channel and the inactivity timer. The shared
//! part of the room (replay table, attached queues, active publisher) sits
//! behind a per-room lock that is only ever held for non-blocking work, so
//! rooms never wait on each other and the dispatch loop never waits on a
//! player.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fogrelay_protocol::{Message, RoomId};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::mailbox::{self, Delivery, MailboxSender};
use crate::{
    PublishHandle, RegistryConfig, RelayMetrics, Replay, RoomError,
    RoomState, SubscriptionQueue,
};

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomState,
    /// Queues currently attached for fan-out.
    pub subscriber_count: usize,
    /// Categories in the replay table.
    pub replay_len: usize,
    /// Whether a publish handle is currently usable.
    pub has_publisher: bool,
}

/// Mutable room state, guarded by [`Room::state`].
struct RoomInner {
    state: RoomState,
    /// Last message per category.
    replay: HashMap<String, Arc<Message>>,
    /// Revocation token of the active publish handle.
    publisher: Option<CancellationToken>,
    subscribers: Vec<MailboxSender<Arc<Message>>>,
}

/// The shared half of a room. The registry keeps one `Arc<Room>` per id.
pub(crate) struct Room {
    id: RoomId,
    secret: String,
    queue_capacity: usize,
    inbound: mpsc::Sender<Arc<Message>>,
    /// Fires once, when the room closes. Publish handles hold child tokens.
    closed: CancellationToken,
    state: Mutex<RoomInner>,
    metrics: Arc<RelayMetrics>,
}

impl Room {
    /// Builds a room and the receiving end of its inbound channel. The
    /// caller starts the actor with [`Room::run`].
    pub(crate) fn new(
        id: RoomId,
        secret: String,
        config: &RegistryConfig,
        metrics: Arc<RelayMetrics>,
    ) -> (Arc<Self>, mpsc::Receiver<Arc<Message>>) {
        let (tx, rx) = mpsc::channel(config.inbound_capacity.max(1));
        let room = Arc::new(Self {
            id,
            secret,
            queue_capacity: config.queue_capacity,
            inbound: tx,
            closed: CancellationToken::new(),
            state: Mutex::new(RoomInner {
                state: RoomState::Active,
                replay: HashMap::new(),
                publisher: None,
                subscribers: Vec::new(),
            }),
            metrics,
        });
        (room, rx)
    }

    pub(crate) fn id(&self) -> &RoomId {
        &self.id
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Issues a new publish handle, revoking the previous one.
    pub(crate) fn install_publisher(&self) -> Result<PublishHandle, RoomError> {
        let mut inner = self.state.lock();
        if !inner.state.is_active() {
            return Err(RoomError::Closed);
        }

        let token = self.closed.child_token();
        if let Some(previous) = inner.publisher.replace(token.clone()) {
            previous.cancel();
            tracing::info!(room_id = %self.id, "publisher replaced");
        }

        Ok(PublishHandle::new(
            self.id.clone(),
            self.secret.clone(),
            self.inbound.clone(),
            token,
        ))
    }

    /// Attaches a new queue and returns it with the current replay table.
    pub(crate) fn attach_subscriber(
        &self,
    ) -> Result<(SubscriptionQueue, Replay), RoomError> {
        let mut inner = self.state.lock();
        if !inner.state.is_active() {
            return Err(RoomError::Closed);
        }

        let (tx, rx) = mailbox::channel(self.queue_capacity);
        inner.subscribers.push(tx);
        self.metrics.active_subscribers.inc();

        let replay: Replay = inner.replay.values().cloned().collect();
        tracing::info!(
            room_id = %self.id,
            subscribers = inner.subscribers.len(),
            replay = replay.len(),
            "player subscribed"
        );

        Ok((
            SubscriptionQueue::new(
                self.id.clone(),
                rx,
                Arc::clone(&self.metrics),
            ),
            replay,
        ))
    }

    pub(crate) fn info(&self) -> RoomInfo {
        let inner = self.state.lock();
        RoomInfo {
            room_id: self.id.clone(),
            state: inner.state,
            subscriber_count: inner.subscribers.len(),
            replay_len: inner.replay.len(),
            has_publisher: inner
                .publisher
                .as_ref()
                .is_some_and(|t| !t.is_cancelled()),
        }
    }

    /// Runs the dispatch loop until the room expires, then closes it.
    ///
    /// Every message resets the timer; the room closes only after
    /// `expiration` without a message.
    pub(crate) async fn run(
        self: Arc<Self>,
        mut inbound: mpsc::Receiver<Arc<Message>>,
        expiration: Duration,
    ) {
        tracing::info!(room_id = %self.id, "room actor started");

        let timer = tokio::time::sleep(expiration);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                Some(msg) = inbound.recv() => {
                    timer.as_mut().reset(Instant::now() + expiration);
                    self.dispatch(msg);
                }
                () = &mut timer => {
                    self.close();
                    break;
                }
            }
        }

        tracing::info!(room_id = %self.id, "room actor stopped");
    }

    /// Records `msg` in the replay table and offers it to every queue.
    /// Queues that are full or already closed are dropped from the room.
    fn dispatch(&self, msg: Arc<Message>) {
        let mut inner = self.state.lock();
        if !inner.state.is_active() {
            return;
        }
        self.metrics.dispatched_messages.inc();
        inner.replay.insert(msg.category.clone(), Arc::clone(&msg));

        let before = inner.subscribers.len();
        let mut evicted = 0;
        inner.subscribers.retain(|sub| {
            match sub.try_deliver(Arc::clone(&msg)) {
                Delivery::Delivered => true,
                Delivery::Evicted => {
                    evicted += 1;
                    false
                }
                Delivery::Closed => false,
            }
        });
        let delivered = inner.subscribers.len();

        if evicted > 0 {
            self.metrics.evicted_subscribers.add(evicted);
            self.metrics.closed_queues.add(evicted);
            tracing::warn!(
                room_id = %self.id,
                evicted,
                "evicted players that fell behind"
            );
        }
        self.metrics
            .active_subscribers
            .add(delivered as i64 - before as i64);

        tracing::debug!(
            room_id = %self.id,
            category = %msg.category,
            delivered,
            "message dispatched"
        );
    }

    /// Transitions to `Closed`: revokes the publisher and closes every
    /// queue. Idempotent.
    pub(crate) fn close(&self) {
        let mut inner = self.state.lock();
        if !inner.state.is_active() {
            return;
        }
        inner.state = RoomState::Closed;
        // Revokes every publish handle ever issued for this room.
        self.closed.cancel();
        inner.publisher = None;

        let subscribers = std::mem::take(&mut inner.subscribers);
        self.metrics.active_subscribers.add(-(subscribers.len() as i64));
        for sub in &subscribers {
            if sub.close() {
                self.metrics.closed_queues.inc();
            }
        }
        inner.replay.clear();

        tracing::info!(
            room_id = %self.id,
            players = subscribers.len(),
            "room expired"
        );
    }
}
