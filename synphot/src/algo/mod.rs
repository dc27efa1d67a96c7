//! Numerical algorithms shared by the photometry code
//!
//! Currently this is interpolation and resampling of tabulated curves.

pub mod misc;

pub use misc::{resample_zero_fill, InterpError};
