//! Per-instance node state and the lazily evaluated model-matrix cache.
//!
//! Writing a node's local matrix only drops that node's cache. Reads walk up
//! to the root every time: a node's cached model matrix is reused only if
//! its parent is itself up to date and has not been recomputed since the
//! cache was filled. Each node carries a revision counter, bumped whenever
//! its model matrix is recomputed or set, and each cache entry remembers
//! the parent revision it was built from.

use std::cell::Cell;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::animation::AnimationTrackInfo;
use crate::graph::armature::ArmatureTemplate;
use crate::graph::node::{NodeTemplate, TrackSample};
use crate::util::{Mat4, TrackIndex, REST_POSE};

#[derive(Clone, Copy, Debug)]
struct CachedModel {
    matrix: Mat4,
    parent_revision: u64,
}

/// Mutable state of one node inside an [`ArmatureInstance`].
#[derive(Clone, Debug)]
pub struct NodeInstance {
    index: usize,
    parent: Option<usize>,
    local: Mat4,
    cache: Cell<Option<CachedModel>>,
    revision: Cell<u64>,
}

impl NodeInstance {
    fn new(index: usize, parent: Option<usize>, local: Mat4) -> Self {
        Self {
            index,
            parent,
            local,
            cache: Cell::new(None),
            revision: Cell::new(0),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    pub fn local_matrix(&self) -> Mat4 {
        self.local
    }

    /// True if this node's own cache entry is filled. Ancestors may still be stale.
    #[inline]
    pub fn has_cached_model(&self) -> bool {
        self.cache.get().is_some()
    }

    /// How many times the model matrix has been recomputed or set.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    #[inline]
    fn set_local(&mut self, m: Mat4) {
        self.local = m;
        self.cache.set(None);
    }

    #[inline]
    fn store(&self, matrix: Mat4, parent_revision: u64) -> u64 {
        self.cache.set(Some(CachedModel { matrix, parent_revision }));
        let rev = self.revision.get() + 1;
        self.revision.set(rev);
        rev
    }
}

/// Live, posable copy of an [`ArmatureTemplate`].
#[derive(Clone, Debug)]
pub struct ArmatureInstance {
    template: Arc<ArmatureTemplate>,
    nodes: Vec<NodeInstance>,
}

impl ArmatureInstance {
    /// One node instance per template node, wired by index, in rest pose.
    pub fn new(template: Arc<ArmatureTemplate>) -> Self {
        let nodes = template
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, n)| NodeInstance::new(i, n.parent(), n.get_local_matrix(REST_POSE, 0.0)))
            .collect::<Vec<_>>();
        debug!(nodes = nodes.len(), "armature instance created");
        Self { template, nodes }
    }

    #[inline]
    pub fn template(&self) -> &Arc<ArmatureTemplate> {
        &self.template
    }

    #[inline]
    pub fn nodes(&self) -> &[NodeInstance] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, index: usize) -> Option<&NodeInstance> {
        self.nodes.get(index)
    }

    #[inline]
    pub fn node_template(&self, index: usize) -> Option<&NodeTemplate> {
        self.template.node(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.template.node_index(name)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&NodeInstance> {
        self.node_index(name).and_then(|i| self.nodes.get(i))
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.template.track_count()
    }

    pub fn track(&self, track: TrackIndex) -> Option<&AnimationTrackInfo> {
        self.template.track(track)
    }

    pub fn track_index(&self, name: &str) -> Option<TrackIndex> {
        self.template.track_index(name)
    }

    /// Current local matrix of node `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    #[inline]
    pub fn local_matrix(&self, index: usize) -> Mat4 {
        self.nodes[index].local
    }

    /// Set node `index`'s local matrix. Only that node's cache is dropped;
    /// descendants notice on their next read.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn set_local_matrix(&mut self, index: usize, m: Mat4) {
        self.nodes[index].set_local(m);
    }

    /// Model matrix (relative to the armature root) of node `index`,
    /// recomputing stale ancestors on the way.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn model_matrix(&self, index: usize) -> Mat4 {
        self.resolve(index).0
    }

    fn resolve(&self, index: usize) -> (Mat4, u64) {
        let mut chain: SmallVec<[usize; 16]> = SmallVec::new();
        let mut cur = Some(index);
        while let Some(i) = cur {
            chain.push(i);
            cur = self.nodes[i].parent;
        }

        let mut parent = None;
        for &i in chain.iter().rev() {
            parent = Some(self.resolve_node(i, parent));
        }
        parent.unwrap_or((Mat4::IDENTITY, 0))
    }

    /// Validate or recompute one node given its parent's resolved state.
    fn resolve_node(&self, index: usize, parent: Option<(Mat4, u64)>) -> (Mat4, u64) {
        let node = &self.nodes[index];
        let parent_revision = parent.map_or(0, |(_, rev)| rev);

        if let Some(cached) = node.cache.get() {
            if cached.parent_revision == parent_revision {
                return (cached.matrix, node.revision.get());
            }
        }

        let matrix = match parent {
            Some((parent_model, _)) => parent_model * node.local,
            None => node.local,
        };
        let rev = node.store(matrix, parent_revision);
        (matrix, rev)
    }

    /// Drive node `index` by its model matrix. The local matrix is solved
    /// against the parent's current model matrix so both stay consistent.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn set_model_matrix(&mut self, index: usize, m: Mat4) {
        let parent = self.nodes[index].parent.map(|p| self.resolve(p));
        let node = &mut self.nodes[index];
        match parent {
            Some((parent_model, parent_revision)) => {
                node.local = parent_model.inverse() * m;
                node.store(m, parent_revision);
            }
            None => {
                node.local = m;
                node.store(m, 0);
            }
        }
    }

    /// Model matrices of every node, in node order.
    ///
    /// Parents precede children, so one forward pass resolves everything.
    pub fn model_matrices(&self) -> Vec<Mat4> {
        let mut resolved: Vec<(Mat4, u64)> = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let parent = node.parent.map(|p| resolved[p]);
            resolved.push(self.resolve_node(i, parent));
        }
        resolved.into_iter().map(|(m, _)| m).collect()
    }

    /// Reset every node to its template rest pose.
    pub fn set_pose_transforms(&mut self) {
        self.set_animation_frame(REST_POSE, 0.0, false);
    }

    /// Sample `track` at `time` into every node.
    ///
    /// With `looped`, time wraps modulo the track duration (if positive).
    /// Negative or unknown tracks give the rest pose.
    pub fn set_animation_frame(&mut self, track: TrackIndex, time: f32, looped: bool) {
        let time = self.template.track(track).map_or(time, |t| t.wrap_time(time, looped));
        let template = Arc::clone(&self.template);
        for (node, t) in self.nodes.iter_mut().zip(template.nodes()) {
            node.set_local(t.get_local_matrix(track, time));
        }
    }

    /// Blend several tracks into every node.
    ///
    /// Weights are normalized to sum to 1; if they sum to 0 every track gets
    /// an equal share.
    pub fn set_animation_frame_blended(&mut self, samples: &[TrackSample], looped: bool) {
        if samples.is_empty() {
            self.set_pose_transforms();
            return;
        }

        let total: f32 = samples.iter().map(|s| s.weight).sum();
        let equal = 1.0 / samples.len() as f32;
        if total == 0.0 {
            warn!(tracks = samples.len(), "blend weights sum to zero, using an equal split");
        }

        let normalized: SmallVec<[TrackSample; 4]> = samples
            .iter()
            .map(|s| TrackSample {
                track: s.track,
                time: self.template.track(s.track).map_or(s.time, |t| t.wrap_time(s.time, looped)),
                weight: if total == 0.0 { equal } else { s.weight / total },
            })
            .collect();

        let template = Arc::clone(&self.template);
        for (node, t) in self.nodes.iter_mut().zip(template.nodes()) {
            node.set_local(t.get_local_matrix_blended(&normalized));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimatableProperty, Interpolation, Keyframes};
    use crate::graph::armature::ArmatureBuilder;
    use crate::util::{Quat, Vec3};

    fn translate(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, y, z))
    }

    fn three_chain() -> ArmatureInstance {
        let mut b = ArmatureBuilder::new();
        let root = b.add_node("root", None).unwrap();
        let child = b.add_node("child", Some(root)).unwrap();
        let grandchild = b.add_node("grandchild", Some(child)).unwrap();
        b.set_local_matrix(child, translate(0.0, 1.0, 0.0)).unwrap();
        b.set_local_matrix(grandchild, translate(0.0, 0.0, 1.0)).unwrap();
        ArmatureInstance::new(Arc::new(b.build().unwrap()))
    }

    /// Top-down recomputation with no caching.
    fn naive_models(a: &ArmatureInstance) -> Vec<Mat4> {
        let mut out: Vec<Mat4> = Vec::with_capacity(a.len());
        for n in a.nodes() {
            let m = match n.parent_index() {
                Some(p) => out[p] * n.local_matrix(),
                None => n.local_matrix(),
            };
            out.push(m);
        }
        out
    }

    #[test]
    fn test_chain_scenario() {
        let mut a = three_chain();
        assert!(a.model_matrix(2).abs_diff_eq(translate(0.0, 1.0, 1.0), 1e-6));

        let root_revision = a.node(0).unwrap().revision();
        a.set_local_matrix(1, translate(0.0, 5.0, 0.0));
        assert!(a.model_matrix(2).abs_diff_eq(translate(0.0, 5.0, 1.0), 1e-6));
        assert!(a.model_matrix(1).abs_diff_eq(translate(0.0, 5.0, 0.0), 1e-6));
        assert_eq!(a.node(0).unwrap().revision(), root_revision);
    }

    #[test]
    fn test_set_local_only_drops_own_cache() {
        let mut a = three_chain();
        a.model_matrix(2);
        a.set_local_matrix(1, translate(1.0, 0.0, 0.0));
        assert!(!a.node(1).unwrap().has_cached_model());
        assert!(a.node(2).unwrap().has_cached_model());
    }

    #[test]
    fn test_parent_read_first_does_not_hide_staleness() {
        let mut a = three_chain();
        a.model_matrix(2);
        a.set_local_matrix(1, translate(0.0, 7.0, 0.0));
        // Refresh the parent before the child is asked.
        a.model_matrix(1);
        assert!(a.model_matrix(2).abs_diff_eq(translate(0.0, 7.0, 1.0), 1e-6));
    }

    #[test]
    fn test_cache_matches_naive_recompute() {
        let mut b = ArmatureBuilder::new();
        let r = b.add_node("r", None).unwrap();
        let a1 = b.add_node("a1", Some(r)).unwrap();
        let a2 = b.add_node("a2", Some(a1)).unwrap();
        let b1 = b.add_node("b1", Some(r)).unwrap();
        b.add_node("b2", Some(b1)).unwrap();
        b.add_node("a3", Some(a2)).unwrap();
        let mut arm = ArmatureInstance::new(Arc::new(b.build().unwrap()));

        let writes = [
            (3usize, Mat4::from_rotation_y(0.4)),
            (0, translate(1.0, 2.0, 3.0)),
            (2, Mat4::from_scale(Vec3::new(1.0, 2.0, 1.0))),
            (5, translate(0.0, -1.0, 0.0)),
            (1, Mat4::from_rotation_x(-1.2)),
            (0, Mat4::from_rotation_z(0.3)),
        ];
        for (step, (node, m)) in writes.into_iter().enumerate() {
            arm.set_local_matrix(node, m);
            // Read a varying subset between writes so caches are partially warm.
            for i in (step % 3..arm.len()).step_by(2) {
                arm.model_matrix(i);
            }
            let naive = naive_models(&arm);
            for (i, expected) in naive.iter().enumerate() {
                assert!(arm.model_matrix(i).abs_diff_eq(*expected, 1e-5), "node {i} after write {step}");
            }
        }
    }

    #[test]
    fn test_set_model_matrix_round_trip() {
        let mut a = three_chain();
        a.set_local_matrix(0, Mat4::from_rotation_z(0.5));
        let m = Mat4::from_scale_rotation_translation(Vec3::splat(2.0), Quat::from_rotation_x(0.3), Vec3::new(4.0, 5.0, 6.0));

        a.set_model_matrix(2, m);
        assert!(a.model_matrix(2).abs_diff_eq(m, 1e-5));
        let expected_local = a.model_matrix(1).inverse() * m;
        assert!(a.local_matrix(2).abs_diff_eq(expected_local, 1e-5));

        a.set_model_matrix(0, m);
        assert!(a.model_matrix(0).abs_diff_eq(m, 1e-6));
        assert_eq!(a.local_matrix(0), m);
    }

    #[test]
    fn test_set_model_matrix_then_ancestor_change() {
        let mut a = three_chain();
        a.set_model_matrix(2, translate(0.0, 0.0, 9.0));
        a.set_local_matrix(0, translate(1.0, 0.0, 0.0));
        // Child keeps its solved local matrix and follows the moved ancestor.
        assert!(a.model_matrix(2).abs_diff_eq(translate(1.0, 0.0, 9.0), 1e-6));
    }

    fn animated() -> ArmatureInstance {
        let slide = |to: Vec3| {
            Arc::new(Keyframes::new(vec![0.0, 2.0], vec![Vec3::ZERO, to], Interpolation::Linear).unwrap())
        };
        let mut b = ArmatureBuilder::new();
        let root = b.add_node("root", None).unwrap();
        let t0 = b.add_track(AnimationTrackInfo::new("x", 2.0)).unwrap();
        let t1 = b.add_track(AnimationTrackInfo::new("y", 2.0)).unwrap();
        let translation = AnimatableProperty::new(Vec3::new(0.0, 0.0, 5.0))
            .with_curve(t0, slide(Vec3::new(4.0, 0.0, 0.0)))
            .unwrap()
            .with_curve(t1, slide(Vec3::new(0.0, 4.0, 0.0)))
            .unwrap();
        b.set_translation(root, translation).unwrap();
        ArmatureInstance::new(Arc::new(b.build().unwrap()))
    }

    #[test]
    fn test_animation_frame_and_looping() {
        let mut a = animated();
        a.set_animation_frame(0, 1.0, false);
        assert!(a.model_matrix(0).abs_diff_eq(translate(2.0, 0.0, 0.0), 1e-6));

        a.set_animation_frame(0, 3.0, true);
        assert!(a.model_matrix(0).abs_diff_eq(translate(2.0, 0.0, 0.0), 1e-6));

        // Without looping the curve clamps at its last key.
        a.set_animation_frame(0, 3.0, false);
        assert!(a.model_matrix(0).abs_diff_eq(translate(4.0, 0.0, 0.0), 1e-6));

        a.set_pose_transforms();
        assert!(a.model_matrix(0).abs_diff_eq(translate(0.0, 0.0, 5.0), 1e-6));
    }

    #[test]
    fn test_blend_weight_normalization() {
        let mut a = animated();
        a.set_animation_frame_blended(&[TrackSample::new(0, 1.0, 2.0), TrackSample::new(1, 1.5, 2.0)], false);
        let heavy = a.model_matrix(0);
        a.set_animation_frame_blended(&[TrackSample::new(0, 1.0, 0.5), TrackSample::new(1, 1.5, 0.5)], false);
        let unit = a.model_matrix(0);
        assert_eq!(heavy, unit);
        assert!(unit.abs_diff_eq(translate(1.0, 1.5, 0.0), 1e-6));

        // Zero total falls back to an equal split.
        a.set_animation_frame_blended(&[TrackSample::new(0, 1.0, 0.0), TrackSample::new(1, 1.5, 0.0)], false);
        assert_eq!(a.model_matrix(0), unit);
    }

    #[test]
    fn test_deep_chain_read() {
        const DEPTH: usize = 20_000;
        let mut b = ArmatureBuilder::new();
        let mut parent = b.add_node("n0", None).unwrap();
        for i in 1..DEPTH {
            let n = b.add_node(format!("n{i}"), Some(parent)).unwrap();
            b.set_local_matrix(n, translate(0.0, 1.0, 0.0)).unwrap();
            parent = n;
        }
        let mut a = ArmatureInstance::new(Arc::new(b.build().unwrap()));

        let tip = (DEPTH - 1) as f32;
        assert_eq!(a.model_matrix(DEPTH - 1), translate(0.0, tip, 0.0));

        a.set_local_matrix(0, translate(2.0, 0.0, 0.0));
        assert_eq!(a.model_matrix(DEPTH - 1), translate(2.0, tip, 0.0));

        a.set_model_matrix(DEPTH - 1, translate(0.0, 0.0, 3.0));
        assert!(a.model_matrix(DEPTH - 1).abs_diff_eq(translate(0.0, 0.0, 3.0), 1e-2));

        let all = a.model_matrices();
        assert_eq!(all.len(), DEPTH);
        assert_eq!(all[DEPTH / 2], translate(2.0, (DEPTH / 2) as f32, 0.0));
    }

    #[test]
    fn test_model_matrices_match_single_reads() {
        let mut a = three_chain();
        a.set_local_matrix(1, Mat4::from_rotation_x(0.8));
        a.model_matrix(1);
        let all = a.model_matrices();
        for (i, m) in all.iter().enumerate() {
            assert_eq!(*m, a.model_matrix(i));
        }
    }

    #[test]
    fn test_lookups() {
        let a = animated();
        assert_eq!(a.track_count(), 2);
        assert_eq!(a.track_index("y"), Some(1));
        assert_eq!(a.node_by_name("root").map(|n| n.index()), Some(0));
        assert!(a.node_by_name("missing").is_none());
    }
}
