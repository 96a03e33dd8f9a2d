//! Vector and angle helpers shared by the simulation and the interpolation engine

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A point or displacement in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero-length input
    pub fn normalize(&self) -> Vec2 {
        let len = self.length();
        if len < f32::EPSILON {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2::new(self.x * scalar, self.y * scalar)
    }

    pub fn add(&self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(&self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance(&self, other: Vec2) -> f32 {
        self.sub(other).length()
    }

    /// Heading in radians measured from the +y axis, in (-π, π]
    pub fn angle(&self) -> f32 {
        self.x.atan2(self.y)
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Blends two headings along the shorter arc.
///
/// When the two angles are at least π apart the naive blend would sweep the
/// long way round, so the target is shifted by a full turn before blending
/// and the blend is wrapped back into (-π, π].
pub fn interpolate_direction(d1: f64, d2: f64, ratio: f64) -> f64 {
    let delta = (d2 - d1).abs();
    if delta >= PI {
        let blended = if d1 > d2 {
            d1 + (d2 + 2.0 * PI - d1) * ratio
        } else {
            d1 + (d2 - 2.0 * PI - d1) * ratio
        };
        wrap_angle(blended)
    } else {
        d1 + (d2 - d1) * ratio
    }
}

/// Wraps an angle into (-π, π]
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_vec2_normalize() {
        let v = Vec2::new(3.0, 4.0).normalize();
        assert_approx_eq!(v.length(), 1.0, 1e-6);
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(4.0, 5.0);
        assert_approx_eq!(a.distance(b), 5.0, 1e-6);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(2.0, 10.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 10.0, 1.0), 10.0);
        assert_eq!(lerp(2.0, 10.0, 0.25), 4.0);
    }

    #[test]
    fn test_direction_small_delta_is_linear() {
        assert_approx_eq!(interpolate_direction(0.5, 1.5, 0.5), 1.0, 1e-9);
        assert_approx_eq!(interpolate_direction(-1.0, 1.0, 0.25), -0.5, 1e-9);
    }

    #[test]
    fn test_direction_crosses_pi_boundary() {
        let mid = interpolate_direction(3.0, -3.0, 0.5);
        assert!(mid.abs() > 3.0, "blend went the long way: {}", mid);
        assert_approx_eq!(wrap_angle(mid).abs(), PI, 1e-9);

        let mid = interpolate_direction(-3.0, 3.0, 0.5);
        assert!(mid.abs() > 3.0, "blend went the long way: {}", mid);
    }

    #[test]
    fn test_direction_path_never_exceeds_half_turn() {
        let samples = [-3.1, -2.0, -0.5, 0.0, 0.7, 1.9, 3.1];
        for &d1 in &samples {
            for &d2 in &samples {
                let mut swept = 0.0;
                let mut previous = d1;
                for step in 1..=20 {
                    let current = interpolate_direction(d1, d2, step as f64 / 20.0);
                    swept += wrap_angle(current - previous).abs();
                    previous = current;
                }
                assert!(swept <= PI + 1e-9, "{} -> {} swept {}", d1, d2, swept);
                assert_approx_eq!(wrap_angle(previous), wrap_angle(d2), 1e-9);
            }
        }
    }

    #[test]
    fn test_wrapped_blend_ends_on_target() {
        assert_approx_eq!(interpolate_direction(3.0, -3.0, 1.0), -3.0, 1e-9);
        assert_approx_eq!(interpolate_direction(-3.0, 3.0, 1.0), 3.0, 1e-9);
        assert_approx_eq!(interpolate_direction(3.0, -3.0, 0.0), 3.0, 1e-9);
    }

    #[test]
    fn test_wrap_angle() {
        assert_approx_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, 1e-9);
        assert_approx_eq!(wrap_angle(-3.0 * PI / 2.0), PI / 2.0, 1e-9);
        assert_approx_eq!(wrap_angle(0.3), 0.3, 1e-9);
    }
}
