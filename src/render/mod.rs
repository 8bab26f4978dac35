//! Narrow interfaces to the rendering side.
//!
//! This crate never creates GPU resources. A [`MeshCollection`] resolves mesh
//! indices to drawable geometry and lists the shared effects each mesh uses
//! per blend pass; the draw orchestration only pushes matrices into those
//! effects and asks the collection to issue draws.

mod draw_list;
mod scratch;

pub use draw_list::{DrawEntry, DrawList};
pub use scratch::{DrawFrame, SkinScratch};

use crate::util::Mat4;

/// Index of a shared effect inside a [`MeshCollection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub usize);

/// Per-draw transform pushed into an effect.
#[derive(Clone, Copy, Debug)]
pub enum WorldTransform<'a> {
    /// Single world matrix for a rigid mesh.
    Rigid(Mat4),
    /// Instance world matrix plus column-major skin matrices, one per joint.
    Skinned { world: Mat4, bones: &'a [[f32; 16]] },
}

impl WorldTransform<'_> {
    #[inline]
    pub fn world(&self) -> Mat4 {
        match self {
            Self::Rigid(m) => *m,
            Self::Skinned { world, .. } => *world,
        }
    }

    /// Skin matrices, empty for rigid draws.
    #[inline]
    pub fn bones(&self) -> &[[f32; 16]] {
        match self {
            Self::Rigid(_) => &[],
            Self::Skinned { bones, .. } => bones,
        }
    }
}

/// The "set matrices" contract of a shared shader effect.
pub trait Effect {
    fn set_view_projection(&mut self, projection: Mat4, view: Mat4);
    fn set_world(&mut self, world: &WorldTransform<'_>);
}

/// Shared mesh and effect storage, owned by the renderer.
///
/// Mesh indices come from drawable templates and are validated once when
/// a [`ModelCollection`](crate::graph::ModelCollection) is built.
pub trait MeshCollection {
    type Effect: Effect;

    fn mesh_count(&self) -> usize;

    /// Effects used by the opaque parts of `mesh`. Empty if it has none.
    fn opaque_effects(&self, mesh: usize) -> &[EffectId];

    /// Effects used by the translucent parts of `mesh`. Empty if it has none.
    fn translucent_effects(&self, mesh: usize) -> &[EffectId];

    fn effect_mut(&mut self, id: EffectId) -> Option<&mut Self::Effect>;

    fn draw_opaque(&mut self, mesh: usize, flip_faces: bool);

    fn draw_translucent(&mut self, mesh: usize, flip_faces: bool);
}
