//! Input Events
//!
//! Control events arriving from outside the network and the per-paddle key
//! state the sustain adapters replay every tick.

use serde::{Deserialize, Serialize};

/// Something a player can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Move the left paddle up (toward y = 0).
    LeftUp,
    /// Move the left paddle down.
    LeftDown,
    /// Move the right paddle up.
    RightUp,
    /// Move the right paddle down.
    RightDown,
    /// Increase the gravity constant.
    GravityUp,
    /// Decrease the gravity constant.
    GravityDown,
}

/// A key transition. `pressed` is true on key-down, false on key-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    /// Which key.
    pub action: Action,
    /// Down or up.
    pub pressed: bool,
}

impl ControlEvent {
    /// Key-down event.
    pub fn press(action: Action) -> Self {
        Self {
            action,
            pressed: true,
        }
    }

    /// Key-up event.
    pub fn release(action: Action) -> Self {
        Self {
            action,
            pressed: false,
        }
    }
}

/// Held-key state for one paddle. Both keys held cancel out in the paddle
/// positioner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddleKeys {
    /// Up key held.
    pub up: bool,
    /// Down key held.
    pub down: bool,
}

impl PaddleKeys {
    /// Net movement direction: -1 for up, +1 for down, 0 otherwise. Board y
    /// grows downward.
    pub fn direction(&self) -> f64 {
        match (self.up, self.down) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_direction() {
        assert_eq!(PaddleKeys::default().direction(), 0.0);
        assert_eq!(
            PaddleKeys {
                up: true,
                down: false
            }
            .direction(),
            -1.0
        );
        assert_eq!(
            PaddleKeys {
                up: false,
                down: true
            }
            .direction(),
            1.0
        );
        assert_eq!(
            PaddleKeys {
                up: true,
                down: true
            }
            .direction(),
            0.0,
            "opposing keys cancel"
        );
    }
}
