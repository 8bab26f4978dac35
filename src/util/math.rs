//! Math type re-exports and model-graph specific math utilities.
//!
//! Matrices are glam column-major and act on column vectors, so a child's
//! model matrix is `parent_model * local`.

pub use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Animation track index. Negative values select the rest pose.
pub type TrackIndex = i32;

/// Track index meaning "ignore tracks, use the static/default values".
pub const REST_POSE: TrackIndex = -1;

/// Determinant of the upper-left 3x3 of `m`, expanded by cofactors.
///
/// Kept as an explicit expansion so visibility and winding decisions use
/// the same arithmetic a renderer applies.
#[inline]
pub fn determinant3(m: &Mat4) -> f32 {
    let (a, b, c) = (m.x_axis.x, m.y_axis.x, m.z_axis.x);
    let (d, e, f) = (m.x_axis.y, m.y_axis.y, m.z_axis.y);
    let (g, h, i) = (m.x_axis.z, m.y_axis.z, m.z_axis.z);
    a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
}

/// Bounding sphere.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Empty sphere (negative radius, absorbed by the first merge).
    pub const EMPTY: Self = Self {
        center: Vec3::ZERO,
        radius: -1.0,
    };

    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    /// Sphere under `m`. The radius grows by the largest axis scale.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let scale = m
            .x_axis
            .truncate()
            .length()
            .max(m.y_axis.truncate().length())
            .max(m.z_axis.truncate().length());
        Self {
            center: m.transform_point3(self.center),
            radius: self.radius * scale,
        }
    }

    /// Smallest sphere enclosing both.
    pub fn merge(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        let offset = other.center - self.center;
        let dist = offset.length();
        if dist + other.radius <= self.radius {
            return *self;
        }
        if dist + self.radius <= other.radius {
            return *other;
        }
        let radius = (dist + self.radius + other.radius) * 0.5;
        let center = self.center + offset * ((radius - self.radius) / dist);
        Self { center, radius }
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BoundingSphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundingSphere({:?} r={})", self.center, self.radius)
    }
}
