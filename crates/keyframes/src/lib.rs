//! Keyframe curve sampling.
//!
//! Stores a sorted list of key times with one value per key (or three for
//! cubic splines, glTF layout: in-tangent, value, out-tangent) and samples it
//! with step, linear or cubic Hermite interpolation.
//!
//! Sampling clamps outside the key range; wrapping and looping are left to
//! the caller.

use glam::{Quat, Vec3, Vec4};
use thiserror::Error;

/// Errors raised while building a keyframe curve.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyframeError {
    /// No keys were given
    #[error("Keyframe curve has no keys")]
    Empty,

    /// Key times go backwards
    #[error("Key time at index {index} is smaller than the previous one")]
    Unsorted { index: usize },

    /// Value count does not match the key count and interpolation
    #[error("Expected {expected} values, got {actual}")]
    ValueCount { expected: usize, actual: usize },
}

/// How values between two keys are computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Hold the previous key's value.
    Step,
    /// Straight-line (or spherical for rotations) interpolation.
    #[default]
    Linear,
    /// Cubic Hermite spline with explicit in/out tangents per key.
    CubicSpline,
}

impl Interpolation {
    /// Number of stored values per key.
    #[inline]
    pub fn values_per_key(self) -> usize {
        match self {
            Self::Step | Self::Linear => 1,
            Self::CubicSpline => 3,
        }
    }
}

/// Value types that can be interpolated between keys.
pub trait Interpolate: Copy {
    /// Linear blend from `a` to `b` at `t` in `[0, 1]`.
    fn lerp(a: Self, b: Self, t: f32) -> Self;

    /// Cubic Hermite between `v0` and `v1`.
    ///
    /// `out0` is the leaving tangent of the first key, `in1` the arriving
    /// tangent of the second; both are scaled by the key interval `dt`.
    fn hermite(v0: Self, out0: Self, v1: Self, in1: Self, t: f32, dt: f32) -> Self;
}

#[inline]
fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

macro_rules! impl_interpolate_linear {
    ($($ty:ty),*) => {
        $(
            impl Interpolate for $ty {
                #[inline]
                fn lerp(a: Self, b: Self, t: f32) -> Self {
                    a + (b - a) * t
                }

                #[inline]
                fn hermite(v0: Self, out0: Self, v1: Self, in1: Self, t: f32, dt: f32) -> Self {
                    let (h00, h10, h01, h11) = hermite_basis(t);
                    v0 * h00 + out0 * (h10 * dt) + v1 * h01 + in1 * (h11 * dt)
                }
            }
        )*
    };
}

impl_interpolate_linear!(f32, Vec3, Vec4);

impl Interpolate for Quat {
    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }

    fn hermite(v0: Self, out0: Self, v1: Self, in1: Self, t: f32, dt: f32) -> Self {
        let v = Vec4::hermite(
            Vec4::from(v0),
            Vec4::from(out0),
            Vec4::from(v1),
            Vec4::from(in1),
            t,
            dt,
        );
        Quat::from_vec4(v).normalize()
    }
}

/// A sampled curve: key times plus values.
#[derive(Clone, Debug)]
pub struct Keyframes<T> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: Interpolation,
}

impl<T: Interpolate> Keyframes<T> {
    /// Create a curve, validating key order and value count.
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: Interpolation) -> Result<Self, KeyframeError> {
        if times.is_empty() {
            return Err(KeyframeError::Empty);
        }
        if let Some(index) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(KeyframeError::Unsorted { index: index + 1 });
        }
        let expected = times.len() * interpolation.values_per_key();
        if values.len() != expected {
            return Err(KeyframeError::ValueCount { expected, actual: values.len() });
        }
        Ok(Self { times, values, interpolation })
    }

    /// Single-key curve that always returns `value`.
    pub fn constant(value: T) -> Self {
        Self {
            times: vec![0.0],
            values: vec![value],
            interpolation: Interpolation::Step,
        }
    }

    #[inline]
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    #[inline]
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    /// Number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time of the last key.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    #[inline]
    fn value(&self, key: usize) -> T {
        match self.interpolation {
            Interpolation::CubicSpline => self.values[key * 3 + 1],
            _ => self.values[key],
        }
    }

    /// Find the floor key (largest index with time <= `time`).
    #[inline]
    pub fn floor_index(&self, time: f32) -> usize {
        self.times.partition_point(|&t| t <= time).saturating_sub(1)
    }

    /// Sample the curve at `time`, clamping outside the key range.
    pub fn sample(&self, time: f32) -> T {
        let last = self.times.len() - 1;
        if last == 0 || time <= self.times[0] {
            return self.value(0);
        }
        if time >= self.times[last] {
            return self.value(last);
        }

        let k0 = self.floor_index(time);
        let k1 = k0 + 1;
        let (t0, t1) = (self.times[k0], self.times[k1]);
        let dt = t1 - t0;
        if dt <= 0.0 {
            return self.value(k1);
        }
        let t = (time - t0) / dt;

        match self.interpolation {
            Interpolation::Step => self.value(k0),
            Interpolation::Linear => T::lerp(self.value(k0), self.value(k1), t),
            Interpolation::CubicSpline => {
                let out0 = self.values[k0 * 3 + 2];
                let in1 = self.values[k1 * 3];
                T::hermite(self.value(k0), out0, self.value(k1), in1, t, dt)
            }
        }
    }
}
