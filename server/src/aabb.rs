use hoops_shared::vec3::{add, scale, sub, Vec3};

/// World axis, used to drive axis-sequential collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn of(self, v: Vec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Axis-aligned box in world space. `min <= max` on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of full `size` centered at `center`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = scale(size, 0.5);
        Self::new(sub(center, half), add(center, half))
    }

    pub fn center(&self) -> Vec3 {
        scale(add(self.min, self.max), 0.5)
    }

    /// Inclusive on faces: touching boxes count as intersecting.
    pub fn intersects(&self, other: &Aabb) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z)
    }

    /// Width of the intersection on each axis. Negative components mean the
    /// boxes are separated on that axis.
    pub fn overlap(&self, other: &Aabb) -> Vec3 {
        Vec3::new(
            self.max.x.min(other.max.x) - self.min.x.max(other.min.x),
            self.max.y.min(other.max.y) - self.min.y.max(other.min.y),
            self.max.z.min(other.max.z) - self.min.z.max(other.min.z),
        )
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// Axis with the smallest penetration, ties resolved X, then Y, then Z.
pub fn min_penetration_axis(overlap: Vec3) -> Axis {
    if overlap.x <= overlap.y && overlap.x <= overlap.z {
        Axis::X
    } else if overlap.y <= overlap.z {
        Axis::Y
    } else {
        Axis::Z
    }
}
