//! Decomposed scale/rotation/translation transform.

use crate::util::{Error, Mat3, Mat4, Quat, Result, Vec3};

/// Quaternions whose length drifts further than this from 1 are renormalized.
pub const QUATERNION_TOLERANCE: f32 = 0.0077;

const SKEW_TOLERANCE: f32 = 1e-3;
const DEGENERATE_SCALE: f32 = 1e-8;

/// Renormalize `q` if its length has drifted from 1.
///
/// A zero quaternion becomes identity.
#[inline]
pub fn sanitize_rotation(q: Quat) -> Quat {
    let len = q.length();
    if (len - 1.0).abs() <= QUATERNION_TOLERANCE {
        q
    } else if len > f32::EPSILON {
        q / len
    } else {
        Quat::IDENTITY
    }
}

/// Scale, then rotate, then translate. No skew.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    pub scale: Vec3,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform {
    pub const IDENTITY: Self = Self {
        scale: Vec3::ONE,
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Build from components. The rotation is sanitized.
    #[inline]
    pub fn new(scale: Vec3, rotation: Quat, translation: Vec3) -> Self {
        Self {
            scale,
            rotation: sanitize_rotation(rotation),
            translation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    /// Decompose a matrix.
    ///
    /// Fails with [`Error::InvalidTransform`] for projective matrices, zero
    /// scale axes, or axes that are not mutually orthogonal (skew).
    pub fn try_from_matrix(m: &Mat4) -> Result<Self> {
        let w = glam::Vec4::new(m.x_axis.w, m.y_axis.w, m.z_axis.w, m.w_axis.w);
        if !w.abs_diff_eq(glam::Vec4::W, SKEW_TOLERANCE) {
            return Err(Error::invalid_transform(format!("projective matrix, bottom row {w:?}")));
        }

        let mut cx = m.x_axis.truncate();
        let cy = m.y_axis.truncate();
        let cz = m.z_axis.truncate();

        let mut sx = cx.length();
        let sy = cy.length();
        let sz = cz.length();
        if sx < DEGENERATE_SCALE || sy < DEGENERATE_SCALE || sz < DEGENERATE_SCALE {
            return Err(Error::invalid_transform("degenerate scale axis"));
        }

        let (nx, ny, nz) = (cx / sx, cy / sy, cz / sz);
        if nx.dot(ny).abs() > SKEW_TOLERANCE
            || nx.dot(nz).abs() > SKEW_TOLERANCE
            || ny.dot(nz).abs() > SKEW_TOLERANCE
        {
            return Err(Error::invalid_transform("matrix has skew"));
        }

        // Mirrored basis: fold the reflection into the x scale.
        if nx.cross(ny).dot(nz) < 0.0 {
            sx = -sx;
            cx = -cx;
        }

        let basis = Mat3::from_cols(cx / sx.abs(), ny, nz);
        let rotation = Quat::from_mat3(&basis).normalize();

        Ok(Self {
            scale: Vec3::new(sx, sy, sz),
            rotation,
            translation: m.w_axis.truncate(),
        })
    }

    /// Equivalent 4x4 matrix.
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    #[inline]
    fn has_uniform_scale(&self) -> bool {
        let s = self.scale;
        (s.x - s.y).abs() <= f32::EPSILON * s.x.abs().max(1.0)
            && (s.x - s.z).abs() <= f32::EPSILON * s.x.abs().max(1.0)
    }

    /// Compose `a` after `b`: the result matches `a.to_matrix() * b.to_matrix()`.
    ///
    /// Composition stays in decomposed form when the product is exactly
    /// representable (uniform scale on `a`, or no rotation on `b`). Otherwise
    /// the matrix product is decomposed, which fails if it carries skew.
    pub fn multiply(a: &Self, b: &Self) -> Result<Self> {
        let b_unrotated = b.rotation.xyz().length_squared() <= f32::EPSILON * f32::EPSILON;
        if a.has_uniform_scale() || b_unrotated {
            return Ok(Self {
                scale: a.scale * b.scale,
                rotation: sanitize_rotation(a.rotation * b.rotation),
                translation: a.translation + a.rotation * (a.scale * b.translation),
            });
        }
        Self::try_from_matrix(&(a.to_matrix() * b.to_matrix()))
    }

    /// Weighted blend.
    ///
    /// Scale and translation are weighted sums, rotation is a weighted
    /// quaternion sum (each aligned to the first quaternion's hemisphere)
    /// renormalized afterwards. Weights are divided by their total; a zero
    /// total is treated as 1.
    pub fn blend(transforms: &[Self], weights: &[f32]) -> Result<Self> {
        if transforms.len() != weights.len() {
            return Err(Error::invalid_argument(format!(
                "blend: {} transforms but {} weights",
                transforms.len(),
                weights.len()
            )));
        }
        let Some(first) = transforms.first() else {
            return Err(Error::invalid_argument("blend: no transforms"));
        };

        let total: f32 = weights.iter().sum();
        let inv_total = if total == 0.0 { 1.0 } else { 1.0 / total };

        let mut scale = Vec3::ZERO;
        let mut rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        let mut translation = Vec3::ZERO;

        for (t, &w) in transforms.iter().zip(weights) {
            let w = w * inv_total;
            scale += t.scale * w;
            translation += t.translation * w;
            let q = if t.rotation.dot(first.rotation) < 0.0 { -t.rotation } else { t.rotation };
            rotation = rotation + q * w;
        }

        Ok(Self {
            scale,
            rotation: sanitize_rotation(rotation),
            translation,
        })
    }
}

impl From<AffineTransform> for Mat4 {
    fn from(t: AffineTransform) -> Self {
        t.to_matrix()
    }
}

impl TryFrom<Mat4> for AffineTransform {
    type Error = Error;

    fn try_from(m: Mat4) -> Result<Self> {
        Self::try_from_matrix(&m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AffineTransform {
        AffineTransform::new(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, -2.0, 3.0),
        )
    }

    #[test]
    fn test_matrix_round_trip() {
        let t = AffineTransform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_euler(glam::EulerRot::ZYX, 0.4, -0.2, 1.3),
            Vec3::new(5.0, 6.0, 7.0),
        );
        let back = AffineTransform::try_from_matrix(&t.to_matrix()).unwrap();
        assert!(back.to_matrix().abs_diff_eq(t.to_matrix(), 1e-5));
    }

    #[test]
    fn test_negative_scale_round_trip() {
        let m = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));
        let t = AffineTransform::try_from_matrix(&m).unwrap();
        assert!(t.scale.x < 0.0);
        assert!(t.to_matrix().abs_diff_eq(m, 1e-6));
    }

    #[test]
    fn test_skew_is_rejected() {
        let mut m = Mat4::IDENTITY;
        m.y_axis.x = 0.5;
        let err = AffineTransform::try_from_matrix(&m).unwrap_err();
        assert!(matches!(err, Error::InvalidTransform(_)));

        let mut p = Mat4::IDENTITY;
        p.x_axis.w = 0.2;
        assert!(AffineTransform::try_from_matrix(&p).is_err());
    }

    #[test]
    fn test_multiply_matches_matrix_product() {
        let a = sample();
        let b = AffineTransform::new(
            Vec3::new(1.0, 3.0, 0.5),
            Quat::from_rotation_x(-0.4),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let c = AffineTransform::multiply(&a, &b).unwrap();
        assert!(c.to_matrix().abs_diff_eq(a.to_matrix() * b.to_matrix(), 1e-5));
    }

    #[test]
    fn test_multiply_non_uniform_parent_without_child_rotation() {
        let a = AffineTransform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(0.3), Vec3::X);
        let b = AffineTransform::new(Vec3::new(2.0, 1.0, 1.0), Quat::IDENTITY, Vec3::Y);
        let c = AffineTransform::multiply(&a, &b).unwrap();
        assert!(c.to_matrix().abs_diff_eq(a.to_matrix() * b.to_matrix(), 1e-5));
    }

    #[test]
    fn test_multiply_skewed_product_fails() {
        let a = AffineTransform::new(Vec3::new(1.0, 4.0, 1.0), Quat::IDENTITY, Vec3::ZERO);
        let b = AffineTransform::new(Vec3::ONE, Quat::from_rotation_z(0.5), Vec3::ZERO);
        assert!(matches!(
            AffineTransform::multiply(&a, &b),
            Err(Error::InvalidTransform(_))
        ));
    }

    #[test]
    fn test_blend_single_is_identity_operation() {
        let t = sample();
        let blended = AffineTransform::blend(&[t], &[1.0]).unwrap();
        assert_eq!(blended, t);
    }

    #[test]
    fn test_blend_halfway() {
        let a = AffineTransform::from_translation(Vec3::ZERO);
        let b = AffineTransform::new(Vec3::splat(3.0), Quat::from_rotation_y(1.0), Vec3::new(2.0, 0.0, 0.0));
        let c = AffineTransform::blend(&[a, b], &[1.0, 1.0]).unwrap();
        assert!(c.translation.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
        assert!(c.scale.abs_diff_eq(Vec3::splat(2.0), 1e-6));
        assert!(c.rotation.abs_diff_eq(Quat::from_rotation_y(0.5), 1e-5));
        assert!((c.rotation.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_blend_opposite_hemisphere() {
        let q = Quat::from_rotation_x(0.5);
        let a = AffineTransform::new(Vec3::ONE, q, Vec3::ZERO);
        let b = AffineTransform { rotation: -q, ..a };
        let c = AffineTransform::blend(&[a, b], &[0.5, 0.5]).unwrap();
        assert!(c.rotation.abs_diff_eq(q, 1e-6));
    }

    #[test]
    fn test_blend_zero_total_weight() {
        let t = sample();
        let c = AffineTransform::blend(&[t, t], &[1.0, -1.0]).unwrap();
        assert_eq!(c.scale, Vec3::ZERO);
        assert_eq!(c.translation, Vec3::ZERO);
        assert_eq!(c.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_blend_argument_errors() {
        assert!(matches!(
            AffineTransform::blend(&[sample()], &[1.0, 2.0]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(AffineTransform::blend(&[], &[]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_sanitize_rotation() {
        let q = Quat::from_xyzw(0.0, 0.0, 0.0, 1.005);
        assert_eq!(sanitize_rotation(q), q);
        let drifted = Quat::from_xyzw(0.0, 0.0, 0.0, 1.2);
        assert!((sanitize_rotation(drifted).length() - 1.0).abs() < 1e-6);
        assert_eq!(sanitize_rotation(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)), Quat::IDENTITY);
    }
}
