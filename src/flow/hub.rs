//! Broadcast Hub (mult/tap)
//!
//! Fans one source signal out to a dynamic set of subscriber taps with
//! synchronized back-pressure: the hub does not accept the next source value
//! until every tap registered at the moment distribution began has accepted
//! the current one. This "everyone keeps pace or the network stalls"
//! guarantee is what keeps the cyclic simulation graph consistent tick to
//! tick - no subscriber can observe a stale value while another observes a
//! fresh one within the same logical step.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::join_all;
use tracing::debug;

use crate::flow::signal::{signal, Buffering, SignalReceiver, SignalSender};

/// Handle identifying one registered tap. Returned by [`Hub::tap`], consumed
/// by [`Hub::untap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapHandle(u64);

struct TapEntry<T> {
    sender: SignalSender<T>,
    close_on_source_close: bool,
}

struct TapTable<T> {
    next_id: u64,
    entries: HashMap<u64, TapEntry<T>>,
    source_closed: bool,
}

/// Broadcast hub over a source signal.
///
/// Cheap to clone; all clones share the same tap registry. Dropping every
/// `Hub` handle does not stop distribution - the hub lives until its source
/// closes.
pub struct Hub<T> {
    table: Arc<Mutex<TapTable<T>>>,
}

impl<T> Clone for Hub<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Hub<T> {
    /// Spawn a hub distributing every value of `source` to all taps.
    pub fn new(mut source: SignalReceiver<T>) -> Self {
        let table = Arc::new(Mutex::new(TapTable {
            next_id: 0,
            entries: HashMap::new(),
            source_closed: false,
        }));
        let registry = table.clone();

        tokio::spawn(async move {
            while let Some(value) = source.recv().await {
                // Snapshot the taps registered right now; registrations and
                // removals during distribution take effect from the next
                // value.
                let senders: Vec<SignalSender<T>> = lock(&registry)
                    .entries
                    .values()
                    .map(|e| e.sender.clone())
                    .collect();
                join_all(senders.iter().map(|s| s.send(value.clone()))).await;
            }

            let mut table = lock(&registry);
            table.source_closed = true;
            let mut closed = 0usize;
            table.entries.retain(|_, entry| {
                if entry.close_on_source_close {
                    entry.sender.close();
                    closed += 1;
                    false
                } else {
                    true
                }
            });
            debug!(closed, remaining = table.entries.len(), "hub source closed");
        });

        Self { table }
    }

    /// Register a new tap and return its read side.
    ///
    /// With `close_on_source_close` the tap ends when the source does;
    /// otherwise it stays open for manual lifecycle management. Values
    /// distributed before registration are never replayed.
    pub fn tap(&self, close_on_source_close: bool) -> (TapHandle, SignalReceiver<T>) {
        let (tx, rx) = signal(Buffering::Rendezvous);
        let mut table = lock(&self.table);
        let id = table.next_id;
        table.next_id += 1;
        if table.source_closed && close_on_source_close {
            tx.close();
        } else {
            table.entries.insert(
                id,
                TapEntry {
                    sender: tx,
                    close_on_source_close,
                },
            );
        }
        (TapHandle(id), rx)
    }

    /// Remove a tap registration, closing its signal.
    ///
    /// Safe to call mid-distribution: closing the tap also unblocks an
    /// in-flight delivery to it. Unknown handles are ignored.
    pub fn untap(&self, handle: TapHandle) {
        if let Some(entry) = lock(&self.table).entries.remove(&handle.0) {
            entry.sender.close();
        }
    }

    /// Number of currently registered taps.
    pub fn tap_count(&self) -> usize {
        lock(&self.table).entries.len()
    }
}

fn lock<T>(table: &Arc<Mutex<TapTable<T>>>) -> MutexGuard<'_, TapTable<T>> {
    table.lock().unwrap_or_else(|e| e.into_inner())
}
