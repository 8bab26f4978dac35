//! Static node templates.

use smallvec::SmallVec;

use crate::animation::AnimatableProperty;
use crate::transform::AffineTransform;
use crate::util::{Mat4, Quat, TrackIndex, Vec3};

/// One track contribution to a blended pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSample {
    pub track: TrackIndex,
    pub time: f32,
    pub weight: f32,
}

impl TrackSample {
    pub fn new(track: TrackIndex, time: f32, weight: f32) -> Self {
        Self { track, time, weight }
    }
}

/// How a node produces its local matrix.
#[derive(Clone, Debug)]
pub enum NodeTransform {
    /// Fixed matrix, identical for every track and time.
    Fixed(Mat4),
    /// Three independently animatable channels.
    Animated {
        scale: AnimatableProperty<Vec3>,
        rotation: AnimatableProperty<Quat>,
        translation: AnimatableProperty<Vec3>,
    },
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::rest(AffineTransform::IDENTITY)
    }
}

impl NodeTransform {
    /// Channels with the given rest values and no curves.
    pub fn rest(t: AffineTransform) -> Self {
        Self::Animated {
            scale: AnimatableProperty::new(t.scale),
            rotation: AnimatableProperty::new(t.rotation),
            translation: AnimatableProperty::new(t.translation),
        }
    }

    fn sample(
        scale: &AnimatableProperty<Vec3>,
        rotation: &AnimatableProperty<Quat>,
        translation: &AnimatableProperty<Vec3>,
        track: TrackIndex,
        time: f32,
    ) -> AffineTransform {
        AffineTransform::new(
            scale.get_value_at(track, time),
            rotation.get_value_at(track, time),
            translation.get_value_at(track, time),
        )
    }
}

/// One node of an armature.
#[derive(Clone, Debug)]
pub struct NodeTemplate {
    name: String,
    index: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    transform: NodeTransform,
}

impl NodeTemplate {
    /// Identity-rest node with no children yet.
    pub fn new(index: usize, name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            index,
            parent,
            children: Vec::new(),
            transform: NodeTransform::default(),
        }
    }

    pub fn with_children(mut self, children: Vec<usize>) -> Self {
        self.children = children;
        self
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    #[inline]
    pub fn transform(&self) -> &NodeTransform {
        &self.transform
    }

    pub(crate) fn push_child(&mut self, child: usize) {
        self.children.push(child);
    }

    pub fn set_transform(&mut self, transform: NodeTransform) {
        self.transform = transform;
    }

    /// Switch to a fixed local matrix.
    pub fn set_local_matrix(&mut self, m: Mat4) {
        self.transform = NodeTransform::Fixed(m);
    }

    fn channels_mut(
        &mut self,
    ) -> (
        &mut AnimatableProperty<Vec3>,
        &mut AnimatableProperty<Quat>,
        &mut AnimatableProperty<Vec3>,
    ) {
        if let NodeTransform::Fixed(_) = self.transform {
            self.transform = NodeTransform::default();
        }
        match &mut self.transform {
            NodeTransform::Animated { scale, rotation, translation } => (scale, rotation, translation),
            NodeTransform::Fixed(_) => unreachable!("fixed transform replaced above"),
        }
    }

    /// Replace the scale channel. A fixed node switches to identity-rest channels first.
    pub fn set_scale(&mut self, property: AnimatableProperty<Vec3>) {
        *self.channels_mut().0 = property;
    }

    /// Replace the rotation channel. A fixed node switches to identity-rest channels first.
    pub fn set_rotation(&mut self, property: AnimatableProperty<Quat>) {
        *self.channels_mut().1 = property;
    }

    /// Replace the translation channel. A fixed node switches to identity-rest channels first.
    pub fn set_translation(&mut self, property: AnimatableProperty<Vec3>) {
        *self.channels_mut().2 = property;
    }

    /// True if any channel carries a curve.
    pub fn is_animated(&self) -> bool {
        match &self.transform {
            NodeTransform::Fixed(_) => false,
            NodeTransform::Animated { scale, rotation, translation } => {
                scale.is_animated() || rotation.is_animated() || translation.is_animated()
            }
        }
    }

    /// Highest track index any channel has a curve for.
    pub fn last_animated_track(&self) -> Option<usize> {
        match &self.transform {
            NodeTransform::Fixed(_) => None,
            NodeTransform::Animated { scale, rotation, translation } => scale
                .last_animated_track()
                .max(rotation.last_animated_track())
                .max(translation.last_animated_track()),
        }
    }

    /// Local matrix for `track` at `time`. Fixed nodes ignore both.
    pub fn get_local_matrix(&self, track: TrackIndex, time: f32) -> Mat4 {
        match &self.transform {
            NodeTransform::Fixed(m) => *m,
            NodeTransform::Animated { scale, rotation, translation } => {
                NodeTransform::sample(scale, rotation, translation, track, time).to_matrix()
            }
        }
    }

    /// Local matrix blended from several tracks.
    ///
    /// Each track is sampled into an [`AffineTransform`] and the results are
    /// blended by weight. No samples gives the rest pose.
    pub fn get_local_matrix_blended(&self, samples: &[TrackSample]) -> Mat4 {
        let (scale, rotation, translation) = match &self.transform {
            NodeTransform::Fixed(m) => return *m,
            NodeTransform::Animated { scale, rotation, translation } => (scale, rotation, translation),
        };

        let transforms: SmallVec<[AffineTransform; 4]> = samples
            .iter()
            .map(|s| NodeTransform::sample(scale, rotation, translation, s.track, s.time))
            .collect();
        let weights: SmallVec<[f32; 4]> = samples.iter().map(|s| s.weight).collect();

        match AffineTransform::blend(&transforms, &weights) {
            Ok(t) => t.to_matrix(),
            Err(_) => self.get_local_matrix(crate::util::REST_POSE, 0.0),
        }
    }
}
