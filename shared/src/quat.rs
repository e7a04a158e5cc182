//! Unit quaternions for facing orientation.
//!
//! Clients report the camera orientation as `{x, y, z, w}`; the server only
//! ever uses it to rotate basis vectors, so the API stays small.
use crate::vec3::{add, cross, scale, Vec3};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around a unit `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let half = angle * 0.5;
        let s = half.sin();
        Self::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Returns the unit quaternion, or `None` when the input cannot be one
    /// (non-finite components or near-zero length).
    pub fn normalized(&self) -> Option<Quat> {
        let len = self.length();
        if !len.is_finite() || len < 1e-10 {
            return None;
        }
        Some(Quat::new(
            self.x / len,
            self.y / len,
            self.z / len,
            self.w / len,
        ))
    }

    fn dot(&self, other: &Quat) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }
}

/// Rotate `v` by the unit quaternion `q`.
pub fn rotate(q: Quat, v: Vec3) -> Vec3 {
    // v' = v + 2w(u x v) + 2u x (u x v)
    let u = Vec3::new(q.x, q.y, q.z);
    let t = scale(cross(u, v), 2.0);
    add(add(v, scale(t, q.w)), cross(u, t))
}

/// Spherical linear interpolation along the shortest arc.
pub fn slerp(a: Quat, b: Quat, t: f64) -> Quat {
    let mut d = a.dot(&b);
    let mut b = b;
    if d < 0.0 {
        d = -d;
        b = Quat::new(-b.x, -b.y, -b.z, -b.w);
    }

    // Nearly parallel: fall back to normalized lerp
    if d > 0.9995 {
        let q = Quat::new(
            a.x + t * (b.x - a.x),
            a.y + t * (b.y - a.y),
            a.z + t * (b.z - a.z),
            a.w + t * (b.w - a.w),
        );
        return q.normalized().unwrap_or(a);
    }

    let theta = d.clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();
    let s0 = ((1.0 - t) * theta).sin() / sin_theta;
    let s1 = (t * theta).sin() / sin_theta;

    Quat::new(
        s0 * a.x + s1 * b.x,
        s0 * a.y + s1 * b.y,
        s0 * a.z + s1 * b.z,
        s0 * a.w + s1 * b.w,
    )
}
