//! Rate Adapters
//!
//! Reconcile signals that change at different, independent rates. `sustain`
//! is the workhorse: it lets a sporadically-updated signal (paddle keys) join
//! a per-tick pipeline without ever starving a synchronized read. The
//! timer-based adapters use tokio's virtual clock, never a wall-clock sleep
//! in the simulation's hot loop.

use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::flow::signal::{signal, Buffering, SignalReceiver, SignalSender};

/// Republish the last `source` value once per `clock` value.
///
/// A new `source` value takes over from the next clock pulse on. Clock pulses
/// arriving before the first `source` value produce nothing. When both inputs
/// are ready at once, `source` is serviced first so the freshest value is the
/// one sustained. The output closes with the clock; a closed source merely
/// freezes the held value.
pub fn sustain<T, C>(
    mut source: SignalReceiver<T>,
    mut clock: SignalReceiver<C>,
) -> SignalReceiver<T>
where
    T: Clone + Send + 'static,
    C: Send + 'static,
{
    let (tx, rx) = signal(Buffering::Rendezvous);
    tokio::spawn(async move {
        let mut held: Option<T> = None;
        let mut source_open = true;
        loop {
            tokio::select! {
                biased;
                v = source.recv(), if source_open => match v {
                    Some(v) => held = Some(v),
                    None => source_open = false,
                },
                pulse = clock.recv() => match pulse {
                    Some(_) => {
                        if let Some(h) = held.clone() {
                            tx.send(h).await;
                        }
                    }
                    None => break,
                },
            }
            if tx.is_closed() {
                break;
            }
        }
        tx.close();
    });
    rx
}

/// Emit the first `source` value of each window delimited by `control`
/// pulses; later values in a window coalesce and the latest is emitted when
/// `control` next fires.
///
/// A coalesced value emitted at a window boundary counts as the first value
/// of the new window. Any pending value is flushed when either input closes.
pub fn throttle<T, C>(
    mut source: SignalReceiver<T>,
    mut control: SignalReceiver<C>,
) -> SignalReceiver<T>
where
    T: Send + 'static,
    C: Send + 'static,
{
    let (tx, rx) = signal(Buffering::Rendezvous);
    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        let mut seen_in_window = false;
        loop {
            tokio::select! {
                biased;
                v = source.recv() => match v {
                    Some(v) => {
                        if seen_in_window {
                            pending = Some(v);
                        } else {
                            seen_in_window = true;
                            tx.send(v).await;
                        }
                    }
                    None => {
                        flush(&tx, &mut pending).await;
                        break;
                    }
                },
                pulse = control.recv() => match pulse {
                    Some(_) => {
                        if pending.is_some() {
                            flush(&tx, &mut pending).await;
                            seen_in_window = true;
                        } else {
                            seen_in_window = false;
                        }
                    }
                    None => {
                        flush(&tx, &mut pending).await;
                        break;
                    }
                },
            }
            if tx.is_closed() {
                break;
            }
        }
        tx.close();
    });
    rx
}

/// Emit a `source` value only once `quiet` has elapsed with no further
/// activity; each new arrival resets the timer and replaces the value.
///
/// A pending value is flushed when the source closes.
pub fn debounce<T>(mut source: SignalReceiver<T>, quiet: Duration) -> SignalReceiver<T>
where
    T: Send + 'static,
{
    let (tx, rx) = signal(Buffering::Rendezvous);
    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        loop {
            // The sleep is recreated each iteration, so every source arrival
            // resets the quiet-period timer.
            tokio::select! {
                v = source.recv() => match v {
                    Some(v) => pending = Some(v),
                    None => {
                        flush(&tx, &mut pending).await;
                        break;
                    }
                },
                _ = sleep(quiet), if pending.is_some() => {
                    flush(&tx, &mut pending).await;
                },
            }
            if tx.is_closed() {
                break;
            }
        }
        tx.close();
    });
    rx
}

/// Emit a timestamp once, `quiet` after the most recent `source` activity
/// ceases. Re-arms on new activity; the final burst is still reported when
/// the source closes.
pub fn after_last<T>(mut source: SignalReceiver<T>, quiet: Duration) -> SignalReceiver<Instant>
where
    T: Send + 'static,
{
    let (tx, rx) = signal(Buffering::Rendezvous);
    tokio::spawn(async move {
        let mut armed = false;
        loop {
            tokio::select! {
                v = source.recv() => match v {
                    Some(_) => armed = true,
                    None => {
                        if armed {
                            sleep(quiet).await;
                            tx.send(Instant::now()).await;
                        }
                        break;
                    }
                },
                _ = sleep(quiet), if armed => {
                    tx.send(Instant::now()).await;
                    armed = false;
                },
            }
            if tx.is_closed() {
                break;
            }
        }
        tx.close();
    });
    rx
}

async fn flush<T>(tx: &SignalSender<T>, pending: &mut Option<T>) {
    if let Some(value) = pending.take() {
        tx.send(value).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(1);

    async fn quiesce() {
        // Paused-time sleep resolves only once every task is idle.
        sleep(TICK).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustain_replays_held_value() {
        let (src_tx, src_rx) = signal(Buffering::Rendezvous);
        let (clk_tx, clk_rx) = signal(Buffering::Rendezvous);
        let mut out = sustain(src_rx, clk_rx);

        // No source value yet: a pulse produces nothing.
        clk_tx.send(()).await;
        assert!(timeout(TICK, out.recv()).await.is_err());

        src_tx.send(42).await;
        quiesce().await;
        for _ in 0..3 {
            clk_tx.send(()).await;
            assert_eq!(out.recv().await, Some(42));
        }

        // A new value takes over.
        src_tx.send(7).await;
        quiesce().await;
        clk_tx.send(()).await;
        assert_eq!(out.recv().await, Some(7));

        // Output closes with the clock.
        clk_tx.close();
        assert_eq!(out.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustain_survives_source_close() {
        let (src_tx, src_rx) = signal(Buffering::Rendezvous);
        let (clk_tx, clk_rx) = signal(Buffering::Rendezvous);
        let mut out = sustain(src_rx, clk_rx);

        src_tx.send(5).await;
        quiesce().await;
        src_tx.close();
        quiesce().await;

        clk_tx.send(()).await;
        assert_eq!(out.recv().await, Some(5), "held value is frozen");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_first_then_coalesce() {
        let (src_tx, src_rx) = signal(Buffering::Rendezvous);
        let (ctl_tx, ctl_rx) = signal(Buffering::Rendezvous);
        let mut out = throttle(src_rx, ctl_rx);

        // First value of the window passes straight through.
        src_tx.send(1).await;
        assert_eq!(out.recv().await, Some(1));

        // Later values coalesce; the pulse releases the latest.
        src_tx.send(2).await;
        src_tx.send(3).await;
        quiesce().await;
        ctl_tx.send(()).await;
        assert_eq!(out.recv().await, Some(3));

        // An empty window resets the leading edge.
        ctl_tx.send(()).await;
        quiesce().await;
        src_tx.send(4).await;
        assert_eq!(out.recv().await, Some(4));

        // Pending value is flushed on close.
        src_tx.send(5).await;
        src_tx.send(6).await;
        quiesce().await;
        src_tx.close();
        assert_eq!(out.recv().await, Some(6));
        assert_eq!(out.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_resets_on_activity() {
        let quiet = Duration::from_millis(100);
        let (src_tx, src_rx) = signal(Buffering::Rendezvous);
        let mut out = debounce(src_rx, quiet);

        src_tx.send(1).await;
        sleep(Duration::from_millis(50)).await;
        src_tx.send(2).await;

        // Only the latest value comes out, once the quiet period passes.
        assert_eq!(out.recv().await, Some(2));
        assert!(timeout(quiet * 2, out.recv()).await.is_err());

        // Pending value is flushed when the source closes.
        src_tx.send(3).await;
        quiesce().await;
        src_tx.close();
        assert_eq!(out.recv().await, Some(3));
        assert_eq!(out.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_last_fires_once_per_burst() {
        let quiet = Duration::from_millis(100);
        let (src_tx, src_rx) = signal(Buffering::Rendezvous);
        let mut out = after_last(src_rx, quiet);

        let start = Instant::now();
        src_tx.send(()).await;
        src_tx.send(()).await;
        let first = out.recv().await.unwrap();
        assert!(first - start >= quiet);

        // A second burst re-arms the adapter.
        src_tx.send(()).await;
        assert!(out.recv().await.is_some());
        src_tx.close();
        assert_eq!(out.recv().await, None);
    }
}
