//! Bounded mailbox with a try-deliver-or-evict policy.
//!
//! The producer side never waits: [`MailboxSender::try_deliver`] either
//! queues the item or, when the buffer is full, closes the mailbox. A
//! consumer that can't keep up is dropped instead of stalling whoever
//! feeds it.
//!
//! Both halves can close the mailbox, concurrently if they like. Closing
//! is guarded by an atomic swap so the teardown (firing the closed signal)
//! happens exactly once; `close` returns `true` only to the caller that
//! performed it.
//!
//! ```text
//!   room dispatch loop                    subscriber task
//!   ──────────────────                    ───────────────
//!   try_deliver(msg) ──► [ buffer, cap N ] ──► recv(&cancel).await
//!        │ full                                   │
//!        ▼                                        ▼
//!   close() ──────────► closed signal ──────► Err(Closed)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// Why a receive did not yield an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// The mailbox was closed by either side (or evicted).
    #[error("mailbox closed")]
    Closed,

    /// The caller's cancellation token fired.
    #[error("receive canceled")]
    Canceled,
}

/// Outcome of a non-blocking delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The item is queued.
    Delivered,
    /// The buffer was full: this call closed the mailbox and dropped the item.
    Evicted,
    /// The mailbox was already closed; the item was dropped.
    Closed,
}

/// State shared by both halves.
#[derive(Debug)]
struct Shared {
    closed: AtomicBool,
    signal: CancellationToken,
}

impl Shared {
    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.signal.cancel();
        true
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Creates a mailbox holding at most `capacity` undelivered items.
///
/// A capacity of zero is treated as one.
pub fn channel<T>(capacity: usize) -> (MailboxSender<T>, MailboxReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(Shared {
        closed: AtomicBool::new(false),
        signal: CancellationToken::new(),
    });
    (
        MailboxSender {
            tx,
            shared: Arc::clone(&shared),
        },
        MailboxReceiver { rx, shared },
    )
}

/// Producer half, held by whoever fans out to the consumer.
#[derive(Debug)]
pub struct MailboxSender<T> {
    tx: mpsc::Sender<T>,
    shared: Arc<Shared>,
}

impl<T> MailboxSender<T> {
    /// Queues `item` without waiting. A full buffer evicts the consumer.
    pub fn try_deliver(&self, item: T) -> Delivery {
        if self.shared.is_closed() {
            return Delivery::Closed;
        }
        match self.tx.try_send(item) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                if self.shared.close() {
                    Delivery::Evicted
                } else {
                    // The consumer closed first.
                    Delivery::Closed
                }
            }
            Err(TrySendError::Closed(_)) => {
                self.shared.close();
                Delivery::Closed
            }
        }
    }

    /// Closes the mailbox. Returns `true` if this call did the teardown.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

/// Consumer half, owned by exactly one task.
#[derive(Debug)]
pub struct MailboxReceiver<T> {
    rx: mpsc::Receiver<T>,
    shared: Arc<Shared>,
}

impl<T> MailboxReceiver<T> {
    /// Waits for the next item.
    ///
    /// Once the mailbox is closed every call returns
    /// [`MailboxError::Closed`] and drops whatever is still buffered.
    ///
    /// # Errors
    /// - [`MailboxError::Closed`]: closed by either side, or the sender
    ///   was dropped
    /// - [`MailboxError::Canceled`]: `cancel` fired first
    pub async fn recv(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<T, MailboxError> {
        if self.shared.is_closed() {
            self.drain();
            return Err(MailboxError::Closed);
        }
        let result = tokio::select! {
            biased;
            () = self.shared.signal.cancelled() => Err(MailboxError::Closed),
            () = cancel.cancelled() => Err(MailboxError::Canceled),
            item = self.rx.recv() => item.ok_or(MailboxError::Closed),
        };
        if matches!(result, Err(MailboxError::Closed)) {
            self.drain();
        }
        result
    }

    /// Drops buffered items and refuses further sends.
    fn drain(&mut self) {
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    /// Closes the mailbox. Returns `true` if this call did the teardown.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of items waiting in the buffer.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Drop for MailboxReceiver<T> {
    fn drop(&mut self) {
        self.shared.close();
        // The sender side only learns about the closure on its next
        // delivery attempt.
        self.drain();
    }
}
