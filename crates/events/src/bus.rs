//! Notification publishing/subscription abstraction (mechanics only).
//!
//! The bus carries ledger notifications (`ActorRegistered`, `ProductCreated`) to
//! external observers such as indexers or UI refresh triggers. It is not part of the
//! ledger's correctness: the journal is the source of truth, notifications are
//! published only after a commit, and a failed publish never undoes one.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, TryRecvError};

/// A subscription to the bus. Each subscription receives every message published
/// after it was created (broadcast semantics), in publish order.
///
/// ```ignore
/// let sub = bus.subscribe();
/// while let Ok(msg) = sub.recv() {
///     handle(msg);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Pub/sub abstraction for committed-event notifications.
///
/// Delivery is best-effort fan-out. `publish` may fail; the caller decides whether
/// that is worth more than a log line (the ledger only logs it).
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
