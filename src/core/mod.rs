//! Core primitives.
//!
//! Domain-free building blocks shared by the dataflow substrate and the
//! simulation: 2-D vector math and a deterministic PRNG. Given the same seed,
//! a game run produces the same serve and the same bounce perturbations.

pub mod rng;
pub mod vec2;

pub use rng::DeterministicRng;
pub use vec2::Vec2;
