//! Animatable values: a default plus one optional curve per track.

use std::fmt;
use std::sync::Arc;

use keyframes::{Interpolate, Keyframes};

use crate::util::{Error, Result, TrackIndex};

/// Anything that can be evaluated at a time offset.
///
/// Linear, step and cubic keyframe curves from the `keyframes` crate
/// implement this; importers can plug in their own representations.
pub trait Curve<T>: Send + Sync {
    /// Value at `offset` seconds into the track.
    fn evaluate(&self, offset: f32) -> T;

    /// Time of the last key, if known.
    fn duration(&self) -> f32 {
        0.0
    }
}

impl<T: Interpolate + Send + Sync> Curve<T> for Keyframes<T> {
    #[inline]
    fn evaluate(&self, offset: f32) -> T {
        self.sample(offset)
    }

    #[inline]
    fn duration(&self) -> f32 {
        Keyframes::duration(self)
    }
}

/// Shared curve handle.
pub type CurveRef<T> = Arc<dyn Curve<T>>;

/// A value with an authored default and sparse per-track curves.
#[derive(Clone)]
pub struct AnimatableProperty<T> {
    value: T,
    curves: Vec<Option<CurveRef<T>>>,
}

impl<T: Clone> AnimatableProperty<T> {
    pub fn new(value: T) -> Self {
        Self { value, curves: Vec::new() }
    }

    /// The authored default.
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Store `curve` for `track`, growing the track list as needed.
    pub fn set_curve(&mut self, track: TrackIndex, curve: CurveRef<T>) -> Result<()> {
        let index = usize::try_from(track)
            .map_err(|_| Error::invalid_argument(format!("track index {track} is negative")))?;
        if index >= self.curves.len() {
            self.curves.resize(index + 1, None);
        }
        self.curves[index] = Some(curve);
        Ok(())
    }

    /// Builder form of [`set_curve`](Self::set_curve).
    pub fn with_curve(mut self, track: TrackIndex, curve: CurveRef<T>) -> Result<Self> {
        self.set_curve(track, curve)?;
        Ok(self)
    }

    pub fn curve(&self, track: TrackIndex) -> Option<&CurveRef<T>> {
        let index = usize::try_from(track).ok()?;
        self.curves.get(index)?.as_ref()
    }

    /// True if at least one track has a curve.
    pub fn is_animated(&self) -> bool {
        self.curves.iter().any(Option::is_some)
    }

    /// Highest track index carrying a curve.
    pub fn last_animated_track(&self) -> Option<usize> {
        self.curves.iter().rposition(Option::is_some)
    }

    /// Value of `track` at `time`, or the default when that track has no curve.
    ///
    /// Negative and out-of-range tracks fall back to the default.
    pub fn get_value_at(&self, track: TrackIndex, time: f32) -> T {
        match self.curve(track) {
            Some(curve) => curve.evaluate(time),
            None => self.value.clone(),
        }
    }
}

impl<T: Clone + Default> Default for AnimatableProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for AnimatableProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracks: Vec<usize> = self
            .curves
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|_| i))
            .collect();
        f.debug_struct("AnimatableProperty")
            .field("value", &self.value)
            .field("tracks", &tracks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec3;
    use keyframes::Interpolation;

    fn ramp() -> CurveRef<Vec3> {
        Arc::new(Keyframes::new(vec![0.0, 2.0], vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)], Interpolation::Linear).unwrap())
    }

    #[test]
    fn test_default_value_without_curves() {
        let p = AnimatableProperty::new(Vec3::ONE);
        assert!(!p.is_animated());
        assert_eq!(p.get_value_at(0, 1.0), Vec3::ONE);
        assert_eq!(p.get_value_at(-1, 1.0), Vec3::ONE);
    }

    #[test]
    fn test_sparse_tracks() {
        let mut p = AnimatableProperty::new(Vec3::ONE);
        p.set_curve(2, ramp()).unwrap();
        assert!(p.is_animated());
        assert_eq!(p.last_animated_track(), Some(2));
        assert_eq!(p.get_value_at(2, 1.0), Vec3::new(1.0, 0.0, 0.0));
        // Tracks 0 and 1 exist in the list but carry no curve.
        assert_eq!(p.get_value_at(0, 1.0), Vec3::ONE);
        assert_eq!(p.get_value_at(1, 1.0), Vec3::ONE);
        assert_eq!(p.get_value_at(7, 1.0), Vec3::ONE);
    }

    #[test]
    fn test_negative_track_is_rejected() {
        let mut p = AnimatableProperty::new(Vec3::ONE);
        let err = p.set_curve(-1, ramp()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(!p.is_animated());
    }

    #[test]
    fn test_curve_duration() {
        let c = ramp();
        assert_eq!(c.duration(), 2.0);
    }
}
