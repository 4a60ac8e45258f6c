//! Stream Combinators
//!
//! Stateless or single-state transforms over a signal. Each combinator
//! spawns its own worker task and hands back the read side of its output;
//! close propagates downstream, and a closed output ends the worker so no
//! task is left pumping values nobody reads.

use crate::flow::signal::{signal, Buffering, SignalReceiver};

fn spawn_stage<T, U, F>(mut source: SignalReceiver<T>, mut stage: F) -> SignalReceiver<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Option<U> + Send + 'static,
{
    let (tx, rx) = signal(Buffering::Rendezvous);
    tokio::spawn(async move {
        while let Some(value) = source.recv().await {
            if let Some(out) = stage(value) {
                tx.send(out).await;
            }
            if tx.is_closed() {
                break;
            }
        }
        tx.close();
    });
    rx
}

/// Apply `f` to each value. Propagates close.
pub fn map<T, U, F>(source: SignalReceiver<T>, mut f: F) -> SignalReceiver<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    spawn_stage(source, move |v| Some(f(v)))
}

/// Forward only values satisfying `pred`. Propagates close.
pub fn filter<T, P>(source: SignalReceiver<T>, mut pred: P) -> SignalReceiver<T>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    spawn_stage(source, move |v| if pred(&v) { Some(v) } else { None })
}

/// Difference between consecutive absolute timestamps.
///
/// The first value only seeds the baseline and is never emitted.
pub fn delta(source: SignalReceiver<f64>) -> SignalReceiver<f64> {
    let mut previous: Option<f64> = None;
    spawn_stage(source, move |ts| {
        let diff = previous.map(|prev| ts - prev);
        previous = Some(ts);
        diff
    })
}

/// Suppress consecutive duplicate values (compared by equality).
pub fn distinct<T>(source: SignalReceiver<T>) -> SignalReceiver<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    let mut last: Option<T> = None;
    spawn_stage(source, move |v| {
        if last.as_ref() == Some(&v) {
            None
        } else {
            last = Some(v.clone());
            Some(v)
        }
    })
}

/// Emit 0, 1, 2, ... once per upstream value, ignoring its content.
pub fn counting<T>(source: SignalReceiver<T>) -> SignalReceiver<u64>
where
    T: Send + 'static,
{
    let mut count: u64 = 0;
    spawn_stage(source, move |_| {
        let n = count;
        count += 1;
        Some(n)
    })
}
