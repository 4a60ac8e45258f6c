//! Game Configuration
//!
//! All tunable constants for one game, plus the shared gravity cell. Board
//! coordinates follow canvas conventions: the origin is the top-left corner
//! and y grows downward. A paddle's 1-D position is its top edge.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;

/// Tunable constants for a game. Distances are board units, velocities are
/// board units per millisecond.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board width.
    pub board_width: f64,
    /// Board height.
    pub board_height: f64,
    /// Gap between a paddle face and the board edge; also the y-range
    /// tolerance added to the paddle extent when classifying a hit.
    pub padding: f64,
    /// Paddle thickness along x.
    pub paddle_width: f64,
    /// Paddle extent along y.
    pub paddle_height: f64,
    /// Paddle movement per tick while a key is held.
    pub paddle_step: f64,
    /// Ball radius, used for the top/bottom wall test.
    pub ball_radius: f64,
    /// Lower bound of the randomized serve speed.
    pub serve_speed_min: f64,
    /// Upper bound of the randomized serve speed.
    pub serve_speed_max: f64,
    /// Initial gravity constant G.
    pub gravity: f64,
    /// Upper bound for G; the cell clamps to `[0, gravity_max]`.
    pub gravity_max: f64,
    /// Change in G per gravity key press.
    pub gravity_step: f64,
    /// Bound of the multiplicative jitter applied to a paddle-reflected
    /// velocity component.
    pub perturbation_factor: f64,
    /// Maximum ball speed after a reflection.
    pub max_ball_speed: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: 100.0,
            board_height: 100.0,
            padding: 2.0,
            paddle_width: 8.0,
            paddle_height: 20.0,
            paddle_step: 2.0,
            ball_radius: 2.5,
            serve_speed_min: 0.03,
            serve_speed_max: 0.06,
            gravity: 0.0,
            gravity_max: 0.05,
            gravity_step: 0.002,
            perturbation_factor: 0.05,
            max_ball_speed: 0.2,
        }
    }
}

impl GameConfig {
    /// Board center, the gravity attractor.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.board_width / 2.0, self.board_height / 2.0)
    }

    /// X of the left paddle's face; a predicted x below this is a hit or a
    /// miss of the left paddle.
    pub fn left_wall_x(&self) -> f64 {
        self.paddle_width + self.padding
    }

    /// X of the right paddle's face.
    pub fn right_wall_x(&self) -> f64 {
        self.board_width - self.paddle_width - self.padding
    }

    /// Highest legal paddle position (top edge), so the paddle stays on the
    /// board.
    pub fn max_paddle_travel(&self) -> f64 {
        self.board_height - self.paddle_height
    }

    /// Centered paddle position, used at game start.
    pub fn paddle_start(&self) -> f64 {
        self.max_paddle_travel() / 2.0
    }
}

/// Shared, externally adjustable gravity constant.
///
/// Single logical writer (the input router), many readers (the gravitation
/// node). Relaxed ordering is fine: the value changes only on discrete user
/// input and a stale read for one tick is acceptable.
#[derive(Debug)]
pub struct GravityCell {
    bits: AtomicU64,
    max: f64,
}

impl GravityCell {
    /// Create a cell clamping to `[0, max]`.
    pub fn new(initial: f64, max: f64) -> Self {
        Self {
            bits: AtomicU64::new(initial.clamp(0.0, max).to_bits()),
            max,
        }
    }

    /// Current G.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Set G, clamped to the cell's bounds.
    pub fn set(&self, g: f64) {
        self.bits
            .store(g.clamp(0.0, self.max).to_bits(), Ordering::Relaxed);
    }

    /// Adjust G by `delta`, clamped to the cell's bounds.
    pub fn adjust(&self, delta: f64) {
        self.set(self.get() + delta);
    }
}
