//! Model templates and instances, and the per-instance draw passes.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::graph::armature::ArmatureTemplate;
use crate::graph::drawable::{DrawableInstance, DrawableTemplate};
use crate::graph::instance::ArmatureInstance;
use crate::render::{DrawFrame, Effect, EffectId, MeshCollection, WorldTransform};
use crate::settings::Settings;
use crate::transform::MeshTransform;
use crate::util::{BoundingSphere, Error, Mat4, Result, TrackIndex};

/// Immutable model: an armature, the drawables hanging off it and a bounding sphere.
#[derive(Clone, Debug)]
pub struct ModelTemplate {
    name: String,
    armature: Arc<ArmatureTemplate>,
    drawables: Vec<DrawableTemplate>,
    bounds: BoundingSphere,
}

impl ModelTemplate {
    /// Fails with [`Error::MissingReference`] if a drawable names a node the
    /// armature does not have.
    pub fn new(
        name: impl Into<String>,
        armature: Arc<ArmatureTemplate>,
        drawables: Vec<DrawableTemplate>,
        bounds: BoundingSphere,
    ) -> Result<Self> {
        let name = name.into();
        for d in &drawables {
            d.validate(&armature)?;
        }
        debug!(model = %name, drawables = drawables.len(), "model template created");
        Ok(Self {
            name,
            armature,
            drawables,
            bounds,
        })
    }

    /// Check every mesh index against a collection of `mesh_count` meshes.
    pub fn validate_meshes(&self, mesh_count: usize) -> Result<()> {
        match self.drawables.iter().find(|d| d.mesh_index() >= mesh_count) {
            Some(d) => Err(Error::missing(format!(
                "model '{}': drawable '{}' uses mesh {} of {mesh_count}",
                self.name,
                d.name(),
                d.mesh_index()
            ))),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn armature(&self) -> &Arc<ArmatureTemplate> {
        &self.armature
    }

    #[inline]
    pub fn drawables(&self) -> &[DrawableTemplate] {
        &self.drawables
    }

    #[inline]
    pub fn bounds(&self) -> BoundingSphere {
        self.bounds
    }

    /// Names of the animation tracks, in track order.
    pub fn track_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.armature.tracks().iter().map(|t| t.name.as_str())
    }

    pub fn create_instance(self: &Arc<Self>) -> ModelInstance {
        ModelInstance::new(Arc::clone(self))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Opaque,
    Translucent,
}

#[inline]
fn debug_assert_mesh<M: MeshCollection>(d: &DrawableTemplate, mesh: usize, meshes: &M) {
    debug_assert!(
        mesh < meshes.mesh_count(),
        "drawable '{}' uses mesh {mesh} but the collection has {}",
        d.name(),
        meshes.mesh_count()
    );
}

/// Live, independently posable copy of a [`ModelTemplate`].
///
/// The draw methods expect the template's mesh indices to have been checked
/// against `meshes` with [`ModelTemplate::validate_meshes`];
/// [`ModelCollection::new`](crate::graph::ModelCollection::new) does this.
#[derive(Clone, Debug)]
pub struct ModelInstance {
    template: Arc<ModelTemplate>,
    armature: ArmatureInstance,
    transforms: Vec<MeshTransform>,
    world: Mat4,
}

impl ModelInstance {
    pub fn new(template: Arc<ModelTemplate>) -> Self {
        let armature = ArmatureInstance::new(Arc::clone(&template.armature));
        let transforms = template.drawables.iter().map(DrawableTemplate::create_transform).collect();
        Self {
            template,
            armature,
            transforms,
            world: Mat4::IDENTITY,
        }
    }

    #[inline]
    pub fn template(&self) -> &Arc<ModelTemplate> {
        &self.template
    }

    #[inline]
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    #[inline]
    pub fn set_world_matrix(&mut self, world: Mat4) {
        self.world = world;
    }

    #[inline]
    pub fn armature(&self) -> &ArmatureInstance {
        &self.armature
    }

    #[inline]
    pub fn armature_mut(&mut self) -> &mut ArmatureInstance {
        &mut self.armature
    }

    #[inline]
    pub fn drawable_count(&self) -> usize {
        self.transforms.len()
    }

    /// Drawable `index` with its transform refreshed from the current pose.
    pub fn drawable_instance(&mut self, index: usize) -> Option<DrawableInstance<'_>> {
        let template = self.template.drawables.get(index)?;
        let transform = self.transforms.get_mut(index)?;
        template.update_transform(&self.armature, self.world, transform);
        Some(DrawableInstance { template, transform })
    }

    /// Refresh every drawable transform from the current pose.
    pub fn update_transforms(&mut self) {
        for (d, t) in self.template.drawables.iter().zip(self.transforms.iter_mut()) {
            d.update_transform(&self.armature, self.world, t);
        }
    }

    /// Template bounds under the instance world matrix.
    pub fn world_bounds(&self) -> BoundingSphere {
        self.template.bounds.transformed(&self.world)
    }

    /// Sample `track` at `time`, looping per `settings`.
    pub fn animate(&mut self, track: TrackIndex, time: f32, settings: &Settings) {
        self.armature.set_animation_frame(track, time, settings.loop_animations);
    }

    /// Push the frame's projection and view into every effect this model uses.
    ///
    /// Each shared effect is touched once even if several meshes use it.
    pub fn prepare_effects<M: MeshCollection>(&self, meshes: &mut M, frame: &DrawFrame) {
        let mut ids: SmallVec<[EffectId; 8]> = SmallVec::new();
        for d in &self.template.drawables {
            let mesh = d.mesh_index();
            debug_assert_mesh(d, mesh, meshes);
            ids.extend_from_slice(meshes.opaque_effects(mesh));
            ids.extend_from_slice(meshes.translucent_effects(mesh));
        }
        ids.sort_unstable();
        ids.dedup();

        for id in ids {
            if let Some(effect) = meshes.effect_mut(id) {
                effect.set_view_projection(frame.projection, frame.view);
            }
        }
    }

    /// Draw the opaque parts of every visible drawable.
    pub fn draw_opaque_parts<M: MeshCollection>(&mut self, meshes: &mut M, frame: &mut DrawFrame) {
        self.draw_pass(meshes, frame, Pass::Opaque);
    }

    /// Draw the translucent parts of every visible drawable.
    pub fn draw_translucent_parts<M: MeshCollection>(&mut self, meshes: &mut M, frame: &mut DrawFrame) {
        self.draw_pass(meshes, frame, Pass::Translucent);
    }

    /// Prepare effects, then the opaque pass, then the translucent pass.
    ///
    /// Use the separate passes when translucent parts of several instances
    /// need sorting against each other.
    pub fn draw<M: MeshCollection>(&mut self, meshes: &mut M, frame: &mut DrawFrame) {
        self.prepare_effects(meshes, frame);
        self.draw_opaque_parts(meshes, frame);
        self.draw_translucent_parts(meshes, frame);
    }

    fn draw_pass<M: MeshCollection>(&mut self, meshes: &mut M, frame: &mut DrawFrame, pass: Pass) {
        let Self {
            template,
            armature,
            transforms,
            world,
        } = self;

        for (d, transform) in template.drawables.iter().zip(transforms.iter_mut()) {
            let mesh = d.mesh_index();
            debug_assert_mesh(d, mesh, meshes);
            let effects: SmallVec<[EffectId; 4]> = match pass {
                Pass::Opaque => meshes.opaque_effects(mesh),
                Pass::Translucent => meshes.translucent_effects(mesh),
            }
            .iter()
            .copied()
            .collect();
            if effects.is_empty() {
                continue;
            }

            d.update_transform(armature, *world, transform);
            if !transform.visible() {
                trace!(drawable = d.name(), "skipped, degenerate transform");
                continue;
            }

            let world_transform = match &*transform {
                MeshTransform::Rigid(t) => WorldTransform::Rigid(t.world_matrix()),
                MeshTransform::Skinned(t) => WorldTransform::Skinned {
                    world: *world,
                    bones: frame.scratch.upload(t.joint_matrices()),
                },
            };
            for id in effects {
                if let Some(effect) = meshes.effect_mut(id) {
                    effect.set_world(&world_transform);
                }
            }

            let flip = transform.flip_faces();
            trace!(drawable = d.name(), mesh, ?pass, flip, "draw");
            match pass {
                Pass::Opaque => meshes.draw_opaque(mesh, flip),
                Pass::Translucent => meshes.draw_translucent(mesh, flip),
            }
        }
    }
}
