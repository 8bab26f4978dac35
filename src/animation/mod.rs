//! Animation data: animatable properties, the curve contract and track
//! descriptors.
//!
//! Concrete keyframe curves come from the `keyframes` crate and are
//! re-exported here.

mod property;
mod track;

pub use keyframes::{Interpolate, Interpolation, KeyframeError, Keyframes};
pub use property::{AnimatableProperty, Curve, CurveRef};
pub use track::AnimationTrackInfo;
