//! In-process [`OrderQueue`] backed by tokio mpsc channels.

use crate::model::Order;
use crate::queue::{EnqueuePermit, OrderQueue, QueueError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

enum Sender {
    Unbounded(mpsc::UnboundedSender<Order>),
    Bounded(mpsc::Sender<Order>),
}

enum Receiver {
    Unbounded(mpsc::UnboundedReceiver<Order>),
    Bounded(mpsc::Receiver<Order>),
}

impl Receiver {
    async fn recv(&mut self) -> Option<Order> {
        match self {
            Receiver::Unbounded(receiver) => receiver.recv().await,
            Receiver::Bounded(receiver) => receiver.recv().await,
        }
    }
}

enum Slot<'a> {
    Unbounded(&'a mpsc::UnboundedSender<Order>),
    Bounded(mpsc::Permit<'a, Order>),
}

struct ChannelPermit<'a> {
    queue: &'a ChannelQueue,
    slot: Slot<'a>,
}

impl EnqueuePermit for ChannelPermit<'_> {
    fn commit(self: Box<Self>, order: Order) {
        let ChannelPermit { queue, slot } = *self;
        let order_id = order.id().clone();
        // Count first so a racing fetch never decrements below zero.
        queue.depth.fetch_add(1, Ordering::AcqRel);
        match slot {
            Slot::Bounded(permit) => permit.send(order),
            Slot::Unbounded(sender) => {
                // The receiver lives as long as the queue, so this cannot fail
                // while `queue` is borrowed.
                if sender.send(order).is_err() {
                    queue.depth.fetch_sub(1, Ordering::AcqRel);
                    return;
                }
            }
        }
        debug!(queue = queue.name, %order_id, "Enqueued");
    }
}

/// A blocking queue: `fetch` parks the caller until an order arrives.
///
/// The receiving half sits behind an async mutex so any number of workers can
/// share one queue; exactly one of them gets each order.
pub struct ChannelQueue {
    name: &'static str,
    sender: Sender,
    receiver: Mutex<Receiver>,
    depth: AtomicUsize,
    closed: CancellationToken,
}

impl ChannelQueue {
    /// An unbounded queue; `enqueue` only fails after `close`.
    pub fn unbounded(name: &'static str) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self::from_parts(name, Sender::Unbounded(sender), Receiver::Unbounded(receiver))
    }

    /// A queue holding at most `capacity` orders; `enqueue` returns
    /// [`QueueError::Full`] beyond that.
    pub fn bounded(name: &'static str, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self::from_parts(name, Sender::Bounded(sender), Receiver::Bounded(receiver))
    }

    fn from_parts(name: &'static str, sender: Sender, receiver: Receiver) -> Self {
        Self {
            name,
            sender,
            receiver: Mutex::new(receiver),
            depth: AtomicUsize::new(0),
            closed: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl OrderQueue for ChannelQueue {
    async fn fetch(&self) -> Result<Order, QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }

        let mut receiver = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(QueueError::Closed),
            receiver = self.receiver.lock() => receiver,
        };

        let order = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(QueueError::Closed),
            order = receiver.recv() => order.ok_or(QueueError::Closed)?,
        };

        self.depth.fetch_sub(1, Ordering::AcqRel);
        Ok(order)
    }

    fn reserve(&self, order: &Order) -> Result<Box<dyn EnqueuePermit + '_>, QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }

        let slot = match &self.sender {
            Sender::Unbounded(sender) => Slot::Unbounded(sender),
            Sender::Bounded(sender) => match sender.try_reserve() {
                Ok(permit) => Slot::Bounded(permit),
                Err(e) => {
                    let e = match e {
                        TrySendError::Full(()) => QueueError::Full,
                        TrySendError::Closed(()) => QueueError::Closed,
                    };
                    debug!(queue = self.name, order_id = %order.id(), error = %e, "Enqueue rejected");
                    return Err(e);
                }
            },
        };
        Ok(Box::new(ChannelPermit { queue: self, slot }))
    }

    fn close(&self) {
        debug!(queue = self.name, "Closed");
        self.closed.cancel();
    }

    fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }
}
