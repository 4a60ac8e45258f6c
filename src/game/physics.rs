//! Physics
//!
//! The integration law, the inverse-linear gravity law and the randomized
//! serve. Pure functions over whole-value vectors; every node recomputes
//! from its inputs rather than mutating in place.

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::config::GameConfig;

/// Semi-implicit Euler step with the acceleration term:
/// `p' = p + v*dt + a*dt^2`, exactly and component-wise.
#[inline]
pub fn integrate(position: Vec2, velocity: Vec2, acceleration: Vec2, dt: f64) -> Vec2 {
    Vec2::new(
        position.x + velocity.x * dt + acceleration.x * dt * dt,
        position.y + velocity.y * dt + acceleration.y * dt * dt,
    )
}

/// Acceleration toward `center` with magnitude `g / distance` along the unit
/// vector from `position` to `center`. Exactly zero at zero distance.
#[inline]
pub fn gravity_accel(position: Vec2, center: Vec2, g: f64) -> Vec2 {
    let offset = center - position;
    let distance = offset.length();
    if distance == 0.0 {
        return Vec2::ZERO;
    }
    offset.normalize().scale(g / distance)
}

/// Randomized serve velocity: speed uniform in the configured range, heading
/// toward a random side within 45 degrees of horizontal so every serve
/// approaches a paddle.
pub fn serve_velocity(rng: &mut DeterministicRng, cfg: &GameConfig) -> Vec2 {
    let speed = rng.next_range(cfg.serve_speed_min, cfg.serve_speed_max);
    let angle = rng.next_range(-std::f64::consts::FRAC_PI_4, std::f64::consts::FRAC_PI_4);
    let side = rng.next_sign();
    Vec2::new(side * speed * angle.cos(), speed * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_integrate_at_rest() {
        // Ball at center of a 100x100 board, no motion: stays put.
        let p = integrate(Vec2::new(50.0, 50.0), Vec2::ZERO, Vec2::ZERO, 1.0);
        assert_eq!(p, Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_gravity_zero_distance_guard() {
        let center = Vec2::new(50.0, 50.0);
        assert_eq!(gravity_accel(center, center, 10.0), Vec2::ZERO);
    }

    #[test]
    fn test_gravity_points_at_center() {
        let center = Vec2::new(50.0, 50.0);
        let a = gravity_accel(Vec2::new(30.0, 50.0), center, 2.0);
        assert!(a.x > 0.0);
        assert!(a.y.abs() < 1e-12);
        // distance 20 => magnitude 0.1
        assert!((a.length() - 0.1).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_integration_law_exact(
            px in -1e3..1e3f64, py in -1e3..1e3f64,
            vx in -10.0..10.0f64, vy in -10.0..10.0f64,
            ax in -1.0..1.0f64, ay in -1.0..1.0f64,
            dt in 0.0..100.0f64,
        ) {
            let next = integrate(Vec2::new(px, py), Vec2::new(vx, vy), Vec2::new(ax, ay), dt);
            prop_assert_eq!(next.x, px + vx * dt + ax * dt * dt);
            prop_assert_eq!(next.y, py + vy * dt + ay * dt * dt);
        }

        #[test]
        fn prop_gravity_magnitude_is_g_over_distance(
            px in 0.0..100.0f64, py in 0.0..100.0f64,
            g in 0.0..1.0f64,
        ) {
            let center = Vec2::new(50.0, 50.0);
            let position = Vec2::new(px, py);
            let distance = position.distance(center);
            prop_assume!(distance > 1e-6);
            let a = gravity_accel(position, center, g);
            prop_assert!((a.length() - g / distance).abs() < 1e-9 * (1.0 + g / distance));
        }

        #[test]
        fn prop_serve_speed_in_range(seed in any::<u64>()) {
            let cfg = GameConfig::default();
            let mut rng = DeterministicRng::new(seed);
            let v = serve_velocity(&mut rng, &cfg);
            let speed = v.length();
            prop_assert!(speed >= cfg.serve_speed_min * 0.999);
            prop_assert!(speed <= cfg.serve_speed_max * 1.001);
            // Within 45 degrees of horizontal.
            prop_assert!(v.x.abs() >= v.y.abs() - 1e-12);
        }
    }
}
