//! 3D vector utilities for court-space physics.
//! Y is up; the court's long axis runs along Z.
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Shorthand constructor
pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

/// Dot product
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Cross product
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3 {
        x: a.y * b.z - a.z * b.y,
        y: a.z * b.x - a.x * b.z,
        z: a.x * b.y - a.y * b.x,
    }
}

/// Vector length
pub fn length(v: Vec3) -> f64 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Length of the XZ projection (ground-plane speed for velocities).
pub fn horizontal_length(v: Vec3) -> f64 {
    (v.x * v.x + v.z * v.z).sqrt()
}

/// Normalize vector to unit length. Near-zero vectors come back as zero,
/// so "no direction" stays "no direction".
pub fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len < 1e-10 {
        return Vec3::ZERO;
    }
    Vec3::new(v.x / len, v.y / len, v.z / len)
}

/// Scale vector by scalar
pub fn scale(v: Vec3, s: f64) -> Vec3 {
    Vec3::new(v.x * s, v.y * s, v.z * s)
}

/// Add two vectors
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

/// Subtract vectors (a - b)
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z)
}

/// Linear interpolation. t=0 returns a, t=1 returns b.
pub fn lerp(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    Vec3::new(
        a.x + t * (b.x - a.x),
        a.y + t * (b.y - a.y),
        a.z + t * (b.z - a.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_close(actual: Vec3, expected: Vec3) {
        assert!(
            (actual.x - expected.x).abs() < 1e-6
                && (actual.y - expected.y).abs() < 1e-6
                && (actual.z - expected.z).abs() < 1e-6,
            "Expected {:?} to be close to {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn dot_orthogonal_is_zero() {
        assert_eq!(dot(vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)), 0.0);
    }

    #[test]
    fn cross_x_and_y_is_z() {
        assert_vec3_close(
            cross(vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)),
            vec3(0.0, 0.0, 1.0),
        );
    }

    #[test]
    fn length_of_3_4_0_is_5() {
        assert_eq!(length(vec3(3.0, 4.0, 0.0)), 5.0);
    }

    #[test]
    fn horizontal_length_ignores_y() {
        assert_eq!(horizontal_length(vec3(3.0, 100.0, 4.0)), 5.0);
    }

    #[test]
    fn normalize_returns_unit_vector() {
        let v = normalize(vec3(3.0, 4.0, 0.0));
        assert!((length(v) - 1.0).abs() < 1e-9);
        assert_vec3_close(v, vec3(0.6, 0.8, 0.0));
    }

    #[test]
    fn normalize_zero_stays_zero() {
        assert_eq!(normalize(Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn add_sub_scale() {
        let a = vec3(1.0, 2.0, 3.0);
        let b = vec3(4.0, 5.0, 6.0);
        assert_vec3_close(add(a, b), vec3(5.0, 7.0, 9.0));
        assert_vec3_close(sub(b, a), vec3(3.0, 3.0, 3.0));
        assert_vec3_close(scale(a, 2.0), vec3(2.0, 4.0, 6.0));
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let a = vec3(0.0, 0.0, 0.0);
        let b = vec3(2.0, -4.0, 8.0);
        assert_vec3_close(lerp(a, b, 0.0), a);
        assert_vec3_close(lerp(a, b, 1.0), b);
        assert_vec3_close(lerp(a, b, 0.5), vec3(1.0, -2.0, 4.0));
    }

    #[test]
    fn non_finite_is_detected() {
        assert!(vec3(1.0, 2.0, 3.0).is_finite());
        assert!(!vec3(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!vec3(0.0, f64::INFINITY, 0.0).is_finite());
    }
}
