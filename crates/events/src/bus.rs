//! Change feed publishing/subscription abstraction (mechanics only).
//!
//! The store publishes a `DocumentChange` after every successful write; the
//! trigger runner subscribes and fans changes out to document triggers.
//!
//! ## Delivery
//!
//! - **At-least-once**: a trigger may see the same change more than once
//!   (redelivery after a failed attempt), so handlers must tolerate it.
//! - **Broadcast**: each subscription receives every message published after
//!   it was created.
//! - **No persistence**: the bus distributes, the store is the source of truth.

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError};

/// A subscription to a message stream.
///
/// ```ignore
/// let mut subscription = bus.subscribe();
/// while let Some(change) = subscription.recv().await {
///     dispatch(change).await;
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Transport-agnostic pub/sub bus.
///
/// `publish()` never waits on subscribers; a failure means the message could
/// not be handed to the transport at all.
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
