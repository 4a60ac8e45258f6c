//! Clock Driver
//!
//! Bridges the external per-frame clock into the dataflow network. The
//! [`FrameClock`] is the consumed interface (monotonically increasing
//! timestamps plus a stop handle); the [`Ticker`] converts timestamps into
//! tick deltas and halts the clock once it observes a terminal game state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::flow::signal::{signal, Buffering, SignalReceiver, SignalSender};
use crate::flow::FlowError;

/// A frame delta at least this many times the previous accepted delta is
/// discarded as a tab-suspend artifact. Policy, not a bug.
pub const ANOMALOUS_TICK_FACTOR: f64 = 10.0;

/// Cloneable cancellation handle. Stopping is idempotent and observable by
/// any number of subscribers (the frame producer, the input router).
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Whether stop has been signalled.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe for stop notifications.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Suspend until stop is signalled.
    pub async fn stopped(&self) {
        let mut rx = self.subscribe();
        // The sender lives in self, so wait_for cannot fail.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// The external clock source: monotonically increasing timestamps in
/// milliseconds at display refresh rate, plus a `stop()` that halts
/// production.
pub struct FrameClock {
    frames: SignalReceiver<f64>,
    stop: StopHandle,
}

/// Producing half of a [`FrameClock::feed`] pair. Whatever per-frame callback
/// mechanism backs the clock pushes timestamps here and watches the stop
/// handle to halt further frame requests.
pub struct FrameFeed {
    frames: SignalSender<f64>,
    stop: StopHandle,
}

impl FrameClock {
    /// Create a manually-fed clock, for synthetic or bridged frame sources.
    pub fn feed(buffering: Buffering) -> (FrameFeed, FrameClock) {
        let (tx, rx) = signal(buffering);
        let stop = StopHandle::new();
        (
            FrameFeed {
                frames: tx,
                stop: stop.clone(),
            },
            FrameClock { frames: rx, stop },
        )
    }

    /// A timer-backed clock emitting elapsed milliseconds every `period`.
    ///
    /// Stand-in for an animation-frame callback; sliding buffering absorbs
    /// bursts when the consumer briefly falls behind.
    pub fn interval(period: Duration) -> FrameClock {
        let (feed, clock) = Self::feed(Buffering::Sliding(2));
        tokio::spawn(async move {
            let start = tokio::time::Instant::now();
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut stopped = feed.stop.subscribe();
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let ts = start.elapsed().as_secs_f64() * 1000.0;
                        feed.send(ts).await;
                    }
                    _ = async {
                        let _ = stopped.wait_for(|s| *s).await;
                    } => break,
                }
            }
            // Dropping the feed closes the frame signal.
        });
        clock
    }

    /// Next frame timestamp; `None` once the producer has stopped.
    pub async fn recv(&mut self) -> Option<f64> {
        self.frames.recv().await
    }

    /// Halt the external frame source.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Clone of the clock's stop handle.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

impl FrameFeed {
    /// Push the next frame timestamp.
    pub async fn send(&self, timestamp: f64) {
        self.frames.send(timestamp).await;
    }

    /// Whether the consumer has asked the frame source to halt.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Stop handle shared with the consumer side.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

/// The Clock Driver: {Running, Stopped} state machine turning frame
/// timestamps into game tick deltas.
///
/// While running it emits each accepted delta as a tick, then reads the game
/// state that tick produced from its halt tap; observing a terminal state
/// stops the frame source, closes the tick signal and ends the task. The
/// first timestamp only seeds the delta baseline, and anomalous deltas
/// ([`ANOMALOUS_TICK_FACTOR`]) are discarded.
pub struct Ticker<S> {
    clock: FrameClock,
    halt: SignalReceiver<S>,
    ticks: SignalSender<f64>,
}

impl<S: Send + 'static> Ticker<S> {
    /// Wire a ticker from its clock, halt-state tap and tick output.
    pub fn new(clock: FrameClock, halt: SignalReceiver<S>, ticks: SignalSender<f64>) -> Self {
        Self { clock, halt, ticks }
    }

    /// Run until the frame source closes or `is_terminal` holds for an
    /// observed state. No tick is ever emitted after the transition to
    /// Stopped.
    pub async fn run<F>(mut self, mut is_terminal: F) -> Result<(), FlowError>
    where
        F: FnMut(&S) -> bool + Send,
    {
        let mut last_ts: Option<f64> = None;
        let mut last_delta: Option<f64> = None;

        loop {
            let Some(ts) = self.clock.recv().await else {
                debug!("frame source closed; ticker stopping");
                self.ticks.close();
                return Ok(());
            };
            let Some(prev) = last_ts.replace(ts) else {
                // First frame seeds the baseline, nothing to emit.
                continue;
            };
            let dt = ts - prev;
            if let Some(prev_dt) = last_delta {
                if prev_dt > 0.0 && dt >= prev_dt * ANOMALOUS_TICK_FACTOR {
                    debug!(dt, prev_dt, "discarding anomalous tick");
                    continue;
                }
            }
            last_delta = Some(dt);

            self.ticks.send(dt).await;

            let Some(state) = self.halt.recv().await else {
                return Err(FlowError::closed_mid_iteration("ticker", "halt-state"));
            };
            if is_terminal(&state) {
                info!("terminal state observed; stopping clock");
                self.clock.stop();
                self.ticks.close();
                return Ok(());
            }
        }
    }
}
