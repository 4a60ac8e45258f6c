//! Collision Detection
//!
//! The authoritative per-tick transition function. Classification is done
//! per axis on the predicted next position (the same integration formula the
//! ball positioner applies), so reflecting one axis never alters the other
//! axis's outcome.

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::config::GameConfig;
use crate::game::physics::integrate;
use crate::game::state::{GameState, Phase};

/// Horizontal classification for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalHit {
    /// Ball stays between the paddle planes.
    None,
    /// Reflect off the left paddle.
    LeftPaddle,
    /// Reflect off the right paddle.
    RightPaddle,
    /// Ball crossed a paddle plane outside the paddle's range.
    Miss,
}

/// Vertical classification for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalHit {
    /// Ball stays between the walls.
    None,
    /// Reflect off the top wall.
    Top,
    /// Reflect off the bottom wall.
    Bottom,
}

/// Whether a paddle at `paddle_y` (top edge) covers the ball at `y`,
/// with the configured padding tolerance.
#[inline]
fn paddle_covers(cfg: &GameConfig, paddle_y: f64, y: f64) -> bool {
    y >= paddle_y - cfg.padding && y <= paddle_y + cfg.paddle_height + cfg.padding
}

/// Classify the predicted position against the paddle planes.
pub fn classify_horizontal(
    cfg: &GameConfig,
    predicted: Vec2,
    left_paddle: f64,
    right_paddle: f64,
) -> HorizontalHit {
    if predicted.x < cfg.left_wall_x() {
        if paddle_covers(cfg, left_paddle, predicted.y) {
            HorizontalHit::LeftPaddle
        } else {
            HorizontalHit::Miss
        }
    } else if predicted.x > cfg.right_wall_x() {
        if paddle_covers(cfg, right_paddle, predicted.y) {
            HorizontalHit::RightPaddle
        } else {
            HorizontalHit::Miss
        }
    } else {
        HorizontalHit::None
    }
}

/// Classify the predicted position against the top/bottom walls.
pub fn classify_vertical(cfg: &GameConfig, predicted: Vec2) -> VerticalHit {
    if predicted.y <= cfg.ball_radius {
        VerticalHit::Top
    } else if predicted.y >= cfg.board_height - cfg.ball_radius {
        VerticalHit::Bottom
    } else {
        VerticalHit::None
    }
}

/// Inputs the collision detector reads for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    /// Elapsed milliseconds.
    pub dt: f64,
    /// Ball position at the start of the tick.
    pub position: Vec2,
    /// Ball velocity at the start of the tick.
    pub velocity: Vec2,
    /// Current gravity acceleration.
    pub acceleration: Vec2,
    /// Left paddle top edge.
    pub left_paddle: f64,
    /// Right paddle top edge.
    pub right_paddle: f64,
    /// Game state entering the tick.
    pub state: GameState,
}

/// The detector's two tick-aligned outputs.
#[derive(Debug, Clone, Copy)]
pub struct TickOutput {
    /// Velocity for the rest of this tick.
    pub velocity: Vec2,
    /// State and score after the tick.
    pub state: GameState,
}

/// Run the per-tick transition function.
///
/// On a paddle reflection the offending component is negated, the
/// acceleration contribution for the elapsed tick applied, the speed clamped
/// and a bounded multiplicative jitter injected; the score increments by one.
/// Wall reflections negate the vertical component without jitter or score.
/// A miss is game over with velocity and score untouched.
pub fn step(cfg: &GameConfig, rng: &mut DeterministicRng, input: &TickInput) -> TickOutput {
    let predicted = integrate(input.position, input.velocity, input.acceleration, input.dt);
    let horizontal = classify_horizontal(cfg, predicted, input.left_paddle, input.right_paddle);
    let vertical = classify_vertical(cfg, predicted);
    let score = input.state.score;

    if horizontal == HorizontalHit::Miss {
        return TickOutput {
            velocity: input.velocity,
            state: GameState {
                phase: Phase::GameOver,
                score,
            },
        };
    }

    let paddle_hit = matches!(
        horizontal,
        HorizontalHit::LeftPaddle | HorizontalHit::RightPaddle
    );
    let wall_hit = vertical != VerticalHit::None;

    if !paddle_hit && !wall_hit {
        return TickOutput {
            velocity: input.velocity,
            state: GameState {
                phase: Phase::Moving,
                score,
            },
        };
    }

    let reflected = Vec2::new(
        if paddle_hit {
            -input.velocity.x
        } else {
            input.velocity.x
        },
        if wall_hit {
            -input.velocity.y
        } else {
            input.velocity.y
        },
    );
    let accelerated = reflected + input.acceleration.scale(input.dt);
    let limited = accelerated.clamp_length(cfg.max_ball_speed);
    let velocity = if paddle_hit {
        Vec2::new(
            limited.x * rng.perturbation(cfg.perturbation_factor),
            limited.y,
        )
    } else {
        limited
    };

    TickOutput {
        velocity,
        state: GameState {
            phase: Phase::Collision,
            score: score + u32::from(paddle_hit),
        },
    }
}
