//! Game State
//!
//! The three-phase state machine and the per-tick frame handed to the render
//! sink.

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;

/// Game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Ball in free flight. Initial phase.
    Moving,
    /// A paddle or wall reflection happened this tick. Transient: lasts one
    /// tick unless another reflection follows.
    Collision,
    /// The ball passed a paddle's plane outside its covered range. Terminal
    /// until an external reset (a fresh network run).
    GameOver,
}

/// Tagged game phase plus score. Score is monotonically non-decreasing over
/// a run; a reset starts a new run at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current phase.
    pub phase: Phase,
    /// Paddle reflections so far. Wall bounces do not count.
    pub score: u32,
}

impl GameState {
    /// State at game start.
    pub fn initial() -> Self {
        Self {
            phase: Phase::Moving,
            score: 0,
        }
    }

    /// Whether the run has ended.
    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }
}

/// Everything the render sink needs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    /// Ball center.
    pub ball_position: Vec2,
    /// Ball velocity, board units per millisecond.
    pub ball_velocity: Vec2,
    /// Left paddle top edge.
    pub left_paddle: f64,
    /// Right paddle top edge.
    pub right_paddle: f64,
    /// Game state after this tick.
    pub state: GameState,
    /// Instantaneous frames per second, from this tick's delta.
    pub fps: f64,
}
