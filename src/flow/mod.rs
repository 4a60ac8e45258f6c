//! Concurrent dataflow substrate.
//!
//! A small library of channel combinators: single-slot signals, a broadcast
//! hub with synchronized back-pressure, stream transforms, rate adapters and
//! the clock driver. Simulation nodes are plain tokio tasks that read one
//! value from each input signal per iteration and write one value to each
//! output signal; every suspension point is a signal send or receive.

pub mod clock;
pub mod combinators;
pub mod hub;
pub mod rate;
pub mod signal;

pub use clock::{FrameClock, FrameFeed, StopHandle, Ticker, ANOMALOUS_TICK_FACTOR};
pub use combinators::{counting, delta, distinct, filter, map};
pub use hub::{Hub, TapHandle};
pub use rate::{after_last, debounce, sustain, throttle};
pub use signal::{signal, Buffering, SignalReceiver, SignalSender};

/// Dataflow protocol errors.
///
/// The network's correctness relies on every node iterating exactly once per
/// tick; an input closing partway through an iteration (a torn tick) is fatal
/// to that node and surfaced instead of being silently tolerated. Closure at
/// an iteration boundary, by contrast, is the normal shutdown cascade and is
/// not an error.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// A signal closed after the node had already consumed part of this
    /// iteration's inputs.
    #[error("signal `{signal}` closed mid-iteration in node `{node}`")]
    ClosedMidIteration {
        /// The node whose iteration was torn.
        node: &'static str,
        /// The input signal that closed.
        signal: &'static str,
    },
}

impl FlowError {
    /// Convenience constructor for the torn-tick defect.
    pub fn closed_mid_iteration(node: &'static str, signal: &'static str) -> Self {
        Self::ClosedMidIteration { node, signal }
    }
}
