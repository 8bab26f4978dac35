//! Per-drawable transforms: one world matrix for rigid meshes, one matrix
//! per joint for skinned meshes.

use bytemuck::{Pod, Zeroable};

use crate::util::{determinant3, Error, Mat3, Mat4, Result, Vec3, Vec4};

/// Determinants at or below this magnitude collapse the mesh to nothing.
pub const VISIBILITY_EPSILON: f32 = f32::EPSILON;

/// Up to four joint influences of one skinned vertex.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct JointInfluences {
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

impl JointInfluences {
    pub fn new(joints: [u16; 4], weights: [f32; 4]) -> Self {
        Self { joints, weights }
    }

    /// All weight on a single joint.
    pub fn single(joint: u16) -> Self {
        Self {
            joints: [joint, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    #[inline]
    pub fn weight_sum(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// Non-zero `(joint, weight)` pairs.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.joints
            .iter()
            .zip(self.weights.iter())
            .filter(|(_, w)| **w != 0.0)
            .map(|(&j, &w)| (j as usize, w))
    }
}

/// Rigid transform: the whole mesh moves with one matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidTransform {
    world: Mat4,
    visible: bool,
    flip_faces: bool,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            visible: true,
            flip_faces: false,
        }
    }
}

impl RigidTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `world` and derive visibility and winding from its 3x3 determinant.
    pub fn update(&mut self, world: Mat4) {
        let det = determinant3(&world);
        self.world = world;
        self.visible = det.abs() > VISIBILITY_EPSILON;
        self.flip_faces = det < 0.0;
    }

    #[inline]
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn flip_faces(&self) -> bool {
        self.flip_faces
    }

    #[inline]
    pub fn transform_position(&self, position: Vec3) -> Vec3 {
        self.world.transform_point3(position)
    }

    fn normal_matrix(&self) -> Mat3 {
        let linear = Mat3::from_mat4(self.world);
        if self.visible {
            linear.inverse().transpose()
        } else {
            linear
        }
    }

    /// Normal through the inverse-transpose, renormalized.
    pub fn transform_normal(&self, normal: Vec3) -> Vec3 {
        (self.normal_matrix() * normal).normalize_or_zero()
    }

    /// Tangent direction through the same normal matrix; `w` (handedness) is kept.
    pub fn transform_tangent(&self, tangent: Vec4) -> Vec4 {
        let t = (self.normal_matrix() * tangent.truncate()).normalize_or_zero();
        t.extend(tangent.w)
    }
}

/// Skinned transform: one final matrix per joint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinnedTransform {
    joints: Vec<Mat4>,
}

impl SkinnedTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every joint as `world(j) * inverse_bind(j)`.
    ///
    /// The backing storage is reused when `count` is unchanged.
    pub fn update(
        &mut self,
        count: usize,
        inverse_bind: impl Fn(usize) -> Mat4,
        world: impl Fn(usize) -> Mat4,
    ) {
        self.joints.resize(count, Mat4::IDENTITY);
        for (j, m) in self.joints.iter_mut().enumerate() {
            *m = world(j) * inverse_bind(j);
        }
    }

    /// Same as [`update`](Self::update) from parallel slices.
    pub fn update_from_slices(&mut self, inverse_bind: &[Mat4], world: &[Mat4]) -> Result<()> {
        if inverse_bind.len() != world.len() {
            return Err(Error::invalid_argument(format!(
                "{} inverse bind matrices but {} joint matrices",
                inverse_bind.len(),
                world.len()
            )));
        }
        self.update(inverse_bind.len(), |j| inverse_bind[j], |j| world[j]);
        Ok(())
    }

    #[inline]
    pub fn joint_matrices(&self) -> &[Mat4] {
        &self.joints
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    fn joint(&self, index: usize) -> Mat4 {
        self.joints.get(index).copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Weighted sum of the influencing joints, divided by the weight total.
    ///
    /// Influences whose weights sum to zero leave the position unchanged.
    pub fn transform_position(&self, position: Vec3, influences: &JointInfluences) -> Vec3 {
        let sum = influences.weight_sum();
        if sum == 0.0 {
            return position;
        }
        let inv = 1.0 / sum;
        influences
            .iter()
            .fold(Vec3::ZERO, |acc, (j, w)| acc + self.joint(j).transform_point3(position) * (w * inv))
    }

    /// Weighted sum of the joint-transformed normals, unit length.
    ///
    /// Unlike positions this is not divided by the weight sum; the final
    /// normalization absorbs the scale.
    pub fn transform_normal(&self, normal: Vec3, influences: &JointInfluences) -> Vec3 {
        influences
            .iter()
            .fold(Vec3::ZERO, |acc, (j, w)| acc + self.joint(j).transform_vector3(normal) * w)
            .normalize_or_zero()
    }

    /// As [`transform_normal`](Self::transform_normal); `w` (handedness) is kept.
    pub fn transform_tangent(&self, tangent: Vec4, influences: &JointInfluences) -> Vec4 {
        self.transform_normal(tangent.truncate(), influences).extend(tangent.w)
    }
}

/// Transform owned by one drawable instance.
#[derive(Clone, Debug, PartialEq)]
pub enum MeshTransform {
    Rigid(RigidTransform),
    Skinned(SkinnedTransform),
}

impl MeshTransform {
    /// Skinned meshes are always treated as visible.
    #[inline]
    pub fn visible(&self) -> bool {
        match self {
            Self::Rigid(r) => r.visible(),
            Self::Skinned(_) => true,
        }
    }

    #[inline]
    pub fn flip_faces(&self) -> bool {
        match self {
            Self::Rigid(r) => r.flip_faces(),
            Self::Skinned(_) => false,
        }
    }

    #[inline]
    pub fn as_rigid(&self) -> Option<&RigidTransform> {
        match self {
            Self::Rigid(r) => Some(r),
            Self::Skinned(_) => None,
        }
    }

    #[inline]
    pub fn as_skinned(&self) -> Option<&SkinnedTransform> {
        match self {
            Self::Skinned(s) => Some(s),
            Self::Rigid(_) => None,
        }
    }

    /// Rigid meshes ignore `influences`.
    pub fn transform_position(&self, position: Vec3, influences: &JointInfluences) -> Vec3 {
        match self {
            Self::Rigid(r) => r.transform_position(position),
            Self::Skinned(s) => s.transform_position(position, influences),
        }
    }

    pub fn transform_normal(&self, normal: Vec3, influences: &JointInfluences) -> Vec3 {
        match self {
            Self::Rigid(r) => r.transform_normal(normal),
            Self::Skinned(s) => s.transform_normal(normal, influences),
        }
    }

    pub fn transform_tangent(&self, tangent: Vec4, influences: &JointInfluences) -> Vec4 {
        match self {
            Self::Rigid(r) => r.transform_tangent(tangent),
            Self::Skinned(s) => s.transform_tangent(tangent, influences),
        }
    }
}
