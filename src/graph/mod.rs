//! Scene graph: armature templates and instances, drawables and models.
//!
//! Templates are immutable and shared through `Arc`; instances own all
//! per-use mutable state and never write back into a template.

mod armature;
mod collection;
mod drawable;
mod instance;
mod model;
mod node;

pub use armature::{ArmatureBuilder, ArmatureTemplate};
pub use collection::ModelCollection;
pub use drawable::{DrawableInstance, DrawableTemplate, RigidDrawableTemplate, SkinJoint, SkinnedDrawableTemplate};
pub use instance::{ArmatureInstance, NodeInstance};
pub use model::{ModelInstance, ModelTemplate};
pub use node::{NodeTemplate, NodeTransform, TrackSample};
