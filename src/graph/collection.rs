//! Model templates bound to a shared mesh collection.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, info_span};

use crate::graph::model::{ModelInstance, ModelTemplate};
use crate::render::{DrawFrame, DrawList, MeshCollection};
use crate::settings::Settings;
use crate::util::{Error, Result};

/// Shared meshes plus the model templates that draw them.
pub struct ModelCollection<M: MeshCollection> {
    meshes: M,
    templates: Vec<Arc<ModelTemplate>>,
    settings: Settings,
    draw_list: DrawList,
}

impl<M: MeshCollection> ModelCollection<M> {
    /// Fails with [`Error::MissingReference`] if any drawable points past the
    /// end of `meshes`.
    pub fn new(meshes: M, templates: Vec<Arc<ModelTemplate>>, settings: Settings) -> Result<Self> {
        let mesh_count = meshes.mesh_count();
        for t in &templates {
            t.validate_meshes(mesh_count)?;
        }
        info!(models = templates.len(), meshes = mesh_count, "model collection ready");
        Ok(Self {
            meshes,
            templates,
            settings: settings.validated(),
            draw_list: DrawList::new(),
        })
    }

    #[inline]
    pub fn templates(&self) -> &[Arc<ModelTemplate>] {
        &self.templates
    }

    #[inline]
    pub fn template(&self, index: usize) -> Option<&Arc<ModelTemplate>> {
        self.templates.get(index)
    }

    pub fn template_by_name(&self, name: &str) -> Option<&Arc<ModelTemplate>> {
        self.templates.iter().find(|t| t.name() == name)
    }

    #[inline]
    pub fn meshes(&self) -> &M {
        &self.meshes
    }

    #[inline]
    pub fn meshes_mut(&mut self) -> &mut M {
        &mut self.meshes
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn create_instance(&self, index: usize) -> Result<ModelInstance> {
        self.templates
            .get(index)
            .map(ModelTemplate::create_instance)
            .ok_or_else(|| Error::missing(format!("model {index} of {}", self.templates.len())))
    }

    pub fn create_instance_by_name(&self, name: &str) -> Result<ModelInstance> {
        self.template_by_name(name)
            .map(ModelTemplate::create_instance)
            .ok_or_else(|| Error::missing(format!("model '{name}'")))
    }

    /// Run `f` on every instance, then refresh their drawable transforms.
    ///
    /// Instances are independent, so large batches are spread over the
    /// rayon pool.
    pub fn update_instances<F>(&self, instances: &mut [ModelInstance], f: F)
    where
        F: Fn(&mut ModelInstance) + Send + Sync,
    {
        let _span = info_span!("update_instances", count = instances.len()).entered();
        let apply = |inst: &mut ModelInstance| {
            f(inst);
            inst.update_transforms();
        };
        if instances.len() >= self.settings.parallel_threshold {
            instances.par_iter_mut().for_each(apply);
        } else {
            instances.iter_mut().for_each(apply);
        }
    }

    /// Draw all instances: effects first, then opaque parts in opaque order,
    /// then translucent parts in translucent order.
    pub fn draw(&mut self, instances: &mut [ModelInstance], frame: &mut DrawFrame) {
        let _span = info_span!("draw", count = instances.len()).entered();

        self.draw_list.clear();
        for (i, inst) in instances.iter().enumerate() {
            self.draw_list.push(i, frame.distance_to(inst.world_bounds().center));
            inst.prepare_effects(&mut self.meshes, frame);
        }

        for i in self.draw_list.opaque_order(self.settings.sort_opaque_front_to_back) {
            instances[i].draw_opaque_parts(&mut self.meshes, frame);
        }
        for i in self.draw_list.translucent_order(self.settings.sort_translucent_back_to_front) {
            instances[i].draw_translucent_parts(&mut self.meshes, frame);
        }
        debug!(instances = instances.len(), "frame drawn");
    }
}
