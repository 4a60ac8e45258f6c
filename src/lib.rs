//! # Pongflow
//!
//! A real-time Pong engine built as a network of concurrent dataflow nodes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         PONGFLOW                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── vec2.rs      - 2D vector math                           │
//! │  └── rng.rs       - Deterministic Xorshift128+ PRNG          │
//! │                                                              │
//! │  flow/            - Concurrent dataflow substrate            │
//! │  ├── signal.rs    - Single-slot async channels               │
//! │  ├── hub.rs       - Broadcast with synchronized back-pressure│
//! │  ├── combinators.rs - map / filter / delta / distinct        │
//! │  ├── rate.rs      - sustain / throttle / debounce            │
//! │  └── clock.rs     - Frame clock and the tick driver          │
//! │                                                              │
//! │  game/            - Pong as dataflow nodes                   │
//! │  ├── config.rs    - Tunables and the shared gravity cell     │
//! │  ├── state.rs     - Phase machine and render frames          │
//! │  ├── physics.rs   - Integration, gravity, the serve          │
//! │  ├── collision.rs - Per-tick transition function             │
//! │  ├── input.rs     - Control events and key state             │
//! │  └── network.rs   - Node tasks and graph wiring              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! Every node is a plain tokio task that reads one value from each of its
//! input signals per tick and writes one value to each of its outputs. The
//! broadcast hubs refuse the next source value until every tap has accepted
//! the current one, so the cyclic graph advances in lockstep: within one tick
//! no node can observe another node's next-tick output. Velocity changes only
//! at reflections; positions are integrated exactly from whole-value inputs.
//!
//! Given the same seed, config and frame timestamps, a run is **fully
//! deterministic** - the serve and the bounce jitter both come from a seeded
//! Xorshift128+ stream.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod flow;
pub mod game;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use core::vec2::Vec2;
pub use flow::clock::{FrameClock, FrameFeed, StopHandle, Ticker};
pub use flow::signal::{signal, Buffering, SignalReceiver, SignalSender};
pub use flow::{FlowError, Hub};
pub use game::config::GameConfig;
pub use game::input::{Action, ControlEvent};
pub use game::network::GameNetwork;
pub use game::state::{GameState, Phase, RenderFrame};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
