//! Game logic: Pong as a network of concurrent dataflow nodes.
//!
//! The pure transition functions live in [`physics`] and [`collision`]; the
//! [`network`] module lifts them into tasks communicating exclusively over
//! signals. Given the same seed, config and frame timestamps, a run is fully
//! deterministic.

pub mod collision;
pub mod config;
pub mod input;
pub mod network;
pub mod physics;
pub mod state;

pub use collision::{HorizontalHit, TickInput, TickOutput, VerticalHit};
pub use config::{GameConfig, GravityCell};
pub use input::{Action, ControlEvent, PaddleKeys};
pub use network::GameNetwork;
pub use state::{GameState, Phase, RenderFrame};
