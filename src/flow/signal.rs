//! Signal Channel
//!
//! The basic communication primitive of the dataflow substrate: a typed,
//! single-slot (or small-bounded) asynchronous channel. Values are delivered
//! in send order. Sending on a closed signal is a silent no-op; receiving
//! drains any buffered values and then reports end-of-stream.
//!
//! Signals follow a single-producer, single-consumer discipline: fan-out is
//! the job of [`Hub`](crate::flow::hub::Hub), never of a shared receiver.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

/// Buffering policy, chosen per signal instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Buffering {
    /// Capacity 1: `send` suspends until the previous value has been taken.
    /// The default, and what every hub tap uses.
    #[default]
    Rendezvous,
    /// Capacity N: oldest value dropped on overflow; `send` never suspends.
    /// Used to absorb animation-frame bursts.
    Sliding(usize),
    /// Capacity 1: newest value dropped when full; `send` never suspends.
    Dropping,
}

struct Inner<T> {
    queue: VecDeque<T>,
    closed: bool,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    /// Notified when a slot frees up or the signal closes.
    send_ready: Notify,
    /// Notified when a value arrives or the signal closes.
    recv_ready: Notify,
    buffering: Buffering,
    /// Live sender clones; the signal closes when the last one drops.
    senders: AtomicUsize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A poisoned lock only means a peer task panicked mid-push; the
        // queue itself is still coherent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn close(&self) {
        {
            let mut inner = self.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
        }
        self.send_ready.notify_one();
        self.recv_ready.notify_one();
    }
}

/// Producing half of a signal.
///
/// Cloneable so a hub registry can hold one handle while a distribution
/// snapshot holds another; the signal closes when the last clone drops.
pub struct SignalSender<T> {
    shared: Arc<Shared<T>>,
}

/// Consuming half of a signal. Owned by exactly one node.
pub struct SignalReceiver<T> {
    shared: Arc<Shared<T>>,
}

/// Create a new signal with the given buffering policy.
pub fn signal<T>(buffering: Buffering) -> (SignalSender<T>, SignalReceiver<T>) {
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            queue: VecDeque::new(),
            closed: false,
        }),
        send_ready: Notify::new(),
        recv_ready: Notify::new(),
        buffering,
        senders: AtomicUsize::new(1),
    });
    (
        SignalSender {
            shared: shared.clone(),
        },
        SignalReceiver { shared },
    )
}

impl<T> SignalSender<T> {
    /// Send a value, suspending under rendezvous back-pressure.
    ///
    /// Returns immediately (discarding the value) if the signal is closed.
    pub async fn send(&self, value: T) {
        let mut value = value;
        loop {
            match self.try_push(value) {
                Ok(()) => return,
                Err(v) => value = v,
            }
            self.shared.send_ready.notified().await;
        }
    }

    /// Push without suspending. `Err(value)` means a full rendezvous slot.
    fn try_push(&self, value: T) -> Result<(), T> {
        let mut inner = self.shared.lock();
        if inner.closed {
            return Ok(());
        }
        let pushed = match self.shared.buffering {
            Buffering::Rendezvous => {
                if inner.queue.is_empty() {
                    inner.queue.push_back(value);
                    true
                } else {
                    return Err(value);
                }
            }
            Buffering::Sliding(cap) => {
                let cap = cap.max(1);
                if inner.queue.len() >= cap {
                    inner.queue.pop_front();
                }
                inner.queue.push_back(value);
                true
            }
            Buffering::Dropping => {
                if inner.queue.is_empty() {
                    inner.queue.push_back(value);
                    true
                } else {
                    // Newest value is the one discarded.
                    false
                }
            }
        };
        drop(inner);
        if pushed {
            self.shared.recv_ready.notify_one();
        }
        Ok(())
    }

    /// Close the signal. Idempotent; pending buffered values stay readable.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Whether the signal has been closed (by either side).
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl<T> Clone for SignalSender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for SignalSender<T> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.close();
        }
    }
}

impl<T> SignalReceiver<T> {
    /// Receive the next value, suspending until one is available.
    ///
    /// Returns `None` once the signal is closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            {
                let mut inner = self.shared.lock();
                if let Some(v) = inner.queue.pop_front() {
                    drop(inner);
                    self.shared.send_ready.notify_one();
                    return Some(v);
                }
                if inner.closed {
                    return None;
                }
            }
            self.shared.recv_ready.notified().await;
        }
    }
}

impl<T> Drop for SignalReceiver<T> {
    fn drop(&mut self) {
        // Eager close propagation: a producer must never stay suspended on a
        // signal nobody will ever read again.
        self.shared.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_order() {
        let (tx, mut rx) = signal(Buffering::Sliding(8));
        for i in 0..5 {
            tx.send(i).await;
        }
        for i in 0..5 {
            assert_eq!(rx.recv().await, Some(i));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rendezvous_backpressure() {
        let (tx, mut rx) = signal(Buffering::Rendezvous);
        let sent = Arc::new(AtomicUsize::new(0));
        let counter = sent.clone();
        tokio::spawn(async move {
            for i in 0..3 {
                tx.send(i).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // With paused time, the sleep resolves only once every task is idle.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sent.load(Ordering::SeqCst), 1, "second send must block");

        assert_eq!(rx.recv().await, Some(0));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sent.load(Ordering::SeqCst), 2);

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let (tx, mut rx) = signal(Buffering::Sliding(4));
        tx.send(1).await;
        tx.send(2).await;
        tx.close();
        // Send after close is a silent no-op.
        tx.send(3).await;

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, None);
        assert_eq!(rx.recv().await, None, "close is sticky");
    }

    #[tokio::test]
    async fn test_sliding_drops_oldest() {
        let (tx, mut rx) = signal(Buffering::Sliding(2));
        tx.send(1).await;
        tx.send(2).await;
        tx.send(3).await;
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn test_dropping_drops_newest() {
        let (tx, mut rx) = signal(Buffering::Dropping);
        tx.send(1).await;
        tx.send(2).await;
        tx.send(3).await;
        assert_eq!(rx.recv().await, Some(1));
        tx.send(4).await;
        assert_eq!(rx.recv().await, Some(4));
    }

    #[tokio::test]
    async fn test_last_sender_drop_closes() {
        let (tx, mut rx) = signal::<u32>(Buffering::Rendezvous);
        let tx2 = tx.clone();
        drop(tx);
        tx2.send(7).await;
        drop(tx2);
        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_receiver_drop_unblocks_sender() {
        let (tx, rx) = signal(Buffering::Rendezvous);
        tx.send(1).await;
        drop(rx);
        // Slot is full and nobody will read it, but the close makes this a
        // no-op instead of a suspension.
        tx.send(2).await;
        assert!(tx.is_closed());
    }
}
