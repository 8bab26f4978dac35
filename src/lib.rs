//! # modelgraph
//!
//! Scene-graph instancing and skeletal animation for rigid and skinned 3D
//! models.
//!
//! Content is imported once into immutable, shareable templates. Any number
//! of instances can then be posed, animated and drawn independently, with
//! hierarchical model matrices cached lazily per instance.
//!
//! ## Modules
//!
//! - [`util`] - Math re-exports, bounding spheres, errors
//! - [`transform`] - Decomposed affine transforms, rigid and skinned mesh transforms
//! - [`animation`] - Animatable properties, curves and track descriptors
//! - [`graph`] - Armatures, drawables, models and model collections
//! - [`render`] - Mesh/effect interfaces, draw ordering and skin upload scratch
//! - [`settings`] - JSON-backed runtime settings
//! - [`logging`] - Tracing subscriber setup
//!
//! ## Example
//!
//! ```ignore
//! use modelgraph::prelude::*;
//!
//! let mut b = ArmatureBuilder::new();
//! let root = b.add_node("root", None)?;
//! let arm = b.add_node("arm", Some(root))?;
//! b.set_local_matrix(arm, Mat4::from_translation(Vec3::Y))?;
//! let armature = Arc::new(b.build()?);
//!
//! let model = Arc::new(ModelTemplate::new(
//!     "robot",
//!     armature,
//!     vec![DrawableTemplate::rigid("hand", 0, arm)],
//!     BoundingSphere::new(Vec3::ZERO, 2.0),
//! )?);
//!
//! let mut instance = model.create_instance();
//! instance.armature_mut().set_local_matrix(root, Mat4::from_rotation_z(0.5));
//! let hand = instance.armature().model_matrix(arm);
//! ```

pub mod util;
pub mod transform;
pub mod animation;
pub mod graph;
pub mod render;
pub mod settings;
pub mod logging;

// Re-export commonly used types
pub use util::{Error, Result};
pub use settings::Settings;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::util::{BoundingSphere, Error, Mat4, Quat, Result, TrackIndex, Vec3, Vec4, REST_POSE};
    pub use crate::transform::{AffineTransform, JointInfluences, MeshTransform};
    pub use crate::animation::{AnimatableProperty, AnimationTrackInfo, Curve, Interpolation, Keyframes};
    pub use crate::graph::{
        ArmatureBuilder, ArmatureInstance, ArmatureTemplate, DrawableTemplate, ModelCollection, ModelInstance,
        ModelTemplate, SkinJoint, TrackSample,
    };
    pub use crate::render::{DrawFrame, Effect, EffectId, MeshCollection, WorldTransform};
    pub use crate::settings::Settings;
}
