//! Transform value types.
//!
//! - [`AffineTransform`] - decomposed scale/rotation/translation with
//!   composition and weighted blending
//! - [`MeshTransform`] - rigid or skinned per-drawable transform state

mod affine;
mod mesh_transform;

pub use affine::{sanitize_rotation, AffineTransform, QUATERNION_TOLERANCE};
pub use mesh_transform::{
    JointInfluences, MeshTransform, RigidTransform, SkinnedTransform, VISIBILITY_EPSILON,
};
