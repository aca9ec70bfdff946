//! Angle helpers.
//!
//! All angles handled by the fitting pipeline live in `(-π, π]`. Deltas
//! between two angles are always taken along the shorter arc so that a pose
//! rotating through ±π does not spin the overlay the long way round.

use std::f32::consts::{PI, TAU};

/// Normalize `angle` into `(-π, π]`.
///
/// Non-finite input is returned unchanged.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() || (angle > -PI && angle <= PI) {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Signed shortest-arc difference `to − from`, in `(-π, π]`.
pub fn shortest_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Move `factor` of the way from `from` toward `to` along the shorter arc.
pub fn lerp_angle(from: f32, to: f32, factor: f32) -> f32 {
    wrap_angle(from + shortest_delta(from, to) * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_values_in_range() {
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((wrap_angle(PI) - PI).abs() < 1e-6);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-6);
        assert!((wrap_angle(3.0 * PI).abs() - PI).abs() < 1e-5);
        assert!((wrap_angle(TAU + 0.25) - 0.25).abs() < 1e-5);
        assert!((wrap_angle(-TAU - 0.25) + 0.25).abs() < 1e-5);
    }

    #[test]
    fn shortest_delta_crosses_pi() {
        // 3.0 → -3.1 is a small positive step across the ±π seam.
        let d = shortest_delta(3.0, -3.1);
        assert!(d > 0.0 && d < 0.2, "delta = {d}");
    }

    #[test]
    fn lerp_angle_halfway() {
        let mid = lerp_angle(0.0, 1.0, 0.5);
        assert!((mid - 0.5).abs() < 1e-6);

        let seam = lerp_angle(3.1, -3.1, 0.5);
        assert!(seam.abs() > 3.1, "seam midpoint = {seam}");
    }
}
