//! Validated armature templates and the builder importers use to make them.

use tracing::debug;

use crate::animation::{AnimatableProperty, AnimationTrackInfo};
use crate::graph::node::NodeTemplate;
use crate::util::{Error, Mat4, Quat, Result, TrackIndex, Vec3};

/// Immutable, shareable node hierarchy plus its animation tracks.
///
/// Nodes are stored in topological order: every parent comes before its
/// children, so a single forward pass evaluates the whole hierarchy.
#[derive(Clone, Debug)]
pub struct ArmatureTemplate {
    nodes: Vec<NodeTemplate>,
    tracks: Vec<AnimationTrackInfo>,
}

impl ArmatureTemplate {
    /// Validate and wrap a flattened node array.
    ///
    /// Fails with [`Error::InvalidHierarchy`] when a node's stored index does
    /// not match its position, a parent does not precede its child, a child
    /// does not follow its parent, or parent and child lists disagree.
    /// Fails with [`Error::InvalidArgument`] when a curve targets a track
    /// that has no descriptor.
    pub fn new(nodes: Vec<NodeTemplate>, tracks: Vec<AnimationTrackInfo>) -> Result<Self> {
        for (i, node) in nodes.iter().enumerate() {
            if node.index() != i {
                return Err(Error::hierarchy(format!(
                    "node '{}' at position {i} claims index {}",
                    node.name(),
                    node.index()
                )));
            }

            if let Some(p) = node.parent() {
                if p >= i {
                    return Err(Error::hierarchy(format!("node {i} has parent {p}, parents must come first")));
                }
                if !nodes[p].children().contains(&i) {
                    return Err(Error::hierarchy(format!("node {i} is missing from the child list of node {p}")));
                }
            }

            for &c in node.children() {
                if c <= i || c >= nodes.len() {
                    return Err(Error::hierarchy(format!(
                        "node {i} lists child {c}, children must follow the parent inside {} nodes",
                        nodes.len()
                    )));
                }
                if nodes[c].parent() != Some(i) {
                    return Err(Error::hierarchy(format!(
                        "node {i} lists child {c} whose parent is {:?}",
                        nodes[c].parent()
                    )));
                }
            }

            if let Some(track) = node.last_animated_track() {
                if track >= tracks.len() {
                    return Err(Error::invalid_argument(format!(
                        "node '{}' animates track {track} but only {} tracks exist",
                        node.name(),
                        tracks.len()
                    )));
                }
            }
        }

        debug!(nodes = nodes.len(), tracks = tracks.len(), "armature template created");
        Ok(Self { nodes, tracks })
    }

    #[inline]
    pub fn nodes(&self) -> &[NodeTemplate] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, index: usize) -> Option<&NodeTemplate> {
        self.nodes.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &NodeTemplate> + '_ {
        self.nodes.iter().filter(|n| n.parent().is_none())
    }

    /// Index of the first node named `name`.
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name() == name)
    }

    #[inline]
    pub fn tracks(&self) -> &[AnimationTrackInfo] {
        &self.tracks
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Descriptor of `track`, `None` for the rest pose or unknown tracks.
    pub fn track(&self, track: TrackIndex) -> Option<&AnimationTrackInfo> {
        usize::try_from(track).ok().and_then(|i| self.tracks.get(i))
    }

    /// Index of the first track named `name`.
    pub fn track_index(&self, name: &str) -> Option<TrackIndex> {
        self.tracks
            .iter()
            .position(|t| t.name == name)
            .and_then(|i| track_index_for(i).ok())
    }
}

/// Track position as a [`TrackIndex`].
fn track_index_for(position: usize) -> Result<TrackIndex> {
    TrackIndex::try_from(position)
        .map_err(|_| Error::invalid_argument(format!("track position {position} does not fit a track index")))
}

/// Incremental construction of an [`ArmatureTemplate`].
///
/// Child lists are maintained automatically; [`build`](Self::build) runs the
/// full validation.
#[derive(Debug, Default)]
pub struct ArmatureBuilder {
    nodes: Vec<NodeTemplate>,
    tracks: Vec<AnimationTrackInfo>,
}

impl ArmatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. The parent must already exist.
    pub fn add_node(&mut self, name: impl Into<String>, parent: Option<usize>) -> Result<usize> {
        let index = self.nodes.len();
        if let Some(p) = parent {
            let parent_node = self
                .nodes
                .get_mut(p)
                .ok_or_else(|| Error::hierarchy(format!("parent {p} of new node {index} does not exist yet")))?;
            parent_node.push_child(index);
        }
        self.nodes.push(NodeTemplate::new(index, name, parent));
        Ok(index)
    }

    fn node_mut_checked(&mut self, index: usize) -> Result<&mut NodeTemplate> {
        self.nodes
            .get_mut(index)
            .ok_or_else(|| Error::missing(format!("node {index}")))
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut NodeTemplate> {
        self.nodes.get_mut(index)
    }

    pub fn set_local_matrix(&mut self, node: usize, m: Mat4) -> Result<&mut Self> {
        self.node_mut_checked(node)?.set_local_matrix(m);
        Ok(self)
    }

    pub fn set_scale(&mut self, node: usize, property: AnimatableProperty<Vec3>) -> Result<&mut Self> {
        self.node_mut_checked(node)?.set_scale(property);
        Ok(self)
    }

    pub fn set_rotation(&mut self, node: usize, property: AnimatableProperty<Quat>) -> Result<&mut Self> {
        self.node_mut_checked(node)?.set_rotation(property);
        Ok(self)
    }

    pub fn set_translation(&mut self, node: usize, property: AnimatableProperty<Vec3>) -> Result<&mut Self> {
        self.node_mut_checked(node)?.set_translation(property);
        Ok(self)
    }

    /// Register a track and return its index.
    ///
    /// Fails with [`Error::InvalidArgument`] once the position no longer
    /// fits a [`TrackIndex`].
    pub fn add_track(&mut self, track: AnimationTrackInfo) -> Result<TrackIndex> {
        let index = track_index_for(self.tracks.len())?;
        self.tracks.push(track);
        Ok(index)
    }

    pub fn build(self) -> Result<ArmatureTemplate> {
        ArmatureTemplate::new(self.nodes, self.tracks)
    }
}
