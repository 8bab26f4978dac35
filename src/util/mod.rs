//! Utility types and functions.
//!
//! This module contains fundamental types used throughout the crate:
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, track indices and [`BoundingSphere`]

mod error;
mod math;

pub use error::*;
pub use math::*;
