use std::f32::consts::{PI, TAU};

use nalgebra::Vector2;

/// Minimum planar magnitude required to derive a facing yaw.
const YAW_EPS: f32 = 1.0e-6;

/// Facing yaw (radians about +Y) for a planar direction, `atan2(x, z)`.
///
/// Returns `None` for a (near) zero direction so callers keep their current facing.
pub fn yaw_from_xz(xz: Vector2<f32>) -> Option<f32> {
    if xz.norm_squared() > YAW_EPS {
        return Some(xz.x.atan2(xz.y));
    }

    None
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if current < target {
        (current + max_delta).min(target)
    } else {
        (current - max_delta).max(target)
    }
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Signed delta from `from` to `to` along the shortest arc.
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Frame-rate independent blend factor for exponential smoothing at `rate` per second.
///
/// Always in `[0, 1)` for finite, non-negative inputs, so a value smoothed with it never
/// overshoots its target.
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate.max(0.0) * dt.max(0.0)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approach_clamps_at_target() {
        assert_eq!(approach(0.0, 1.0, 5.0), 1.0);
        assert_eq!(approach(1.0, 0.0, 5.0), 0.0);
        assert!((approach(0.0, 1.0, 0.25) - 0.25).abs() < 1.0e-6);
        assert!((approach(0.0, -1.0, 0.25) + 0.25).abs() < 1.0e-6);
    }

    #[test]
    fn shortest_delta_crosses_the_seam() {
        // 170° to -170° is a 20° turn, not 340°.
        let from = 170f32.to_radians();
        let to = -170f32.to_radians();
        let d = shortest_angle_delta(from, to);
        assert!((d - 20f32.to_radians()).abs() < 1.0e-4);

        let back = shortest_angle_delta(to, from);
        assert!((back + 20f32.to_radians()).abs() < 1.0e-4);
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        for k in -8..=8 {
            let a = wrap_angle(0.5 + k as f32 * TAU);
            assert!((a - 0.5).abs() < 1.0e-4, "k={k} a={a}");
        }
        assert!((wrap_angle(PI) - PI).abs() < 1.0e-6);
    }

    #[test]
    fn yaw_faces_planar_direction() {
        assert!(yaw_from_xz(Vector2::new(0.0, 0.0)).is_none());
        assert!(yaw_from_xz(Vector2::new(0.0, 1.0)).unwrap().abs() < 1.0e-6);
        let east = yaw_from_xz(Vector2::new(1.0, 0.0)).unwrap();
        assert!((east - PI / 2.0).abs() < 1.0e-6);
    }

    #[test]
    fn smoothing_factor_is_frame_rate_independent() {
        // Two half steps must land where one full step does.
        let rate = 10.0;
        let full = smoothing_factor(rate, 0.1);
        let half = smoothing_factor(rate, 0.05);
        let two_halves = 1.0 - (1.0 - half) * (1.0 - half);
        assert!((full - two_halves).abs() < 1.0e-5);
        assert!(full > 0.0 && full < 1.0);
        assert_eq!(smoothing_factor(rate, 0.0), 0.0);
    }
}
