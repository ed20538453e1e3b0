//! Deterministic synthetic data generation helpers.
//!
//! Building blocks for synthetic calibration problems used in tests and
//! examples:
//! - world point grids,
//! - anchors generated from a known transform (optionally with noise),
//! - measurement rows with displacement vectors,
//! - deterministic pseudo-random noise utilities.
//!
//! The helpers are deterministic (explicit seeds; stable point ordering).
//!
//! # Example
//!
//! ```
//! use hordeform_core::TransformState;
//! use hordeform_core::synthetic::{noise::GaussianPixelNoise, survey};
//!
//! let truth = TransformState::new(4.0, 30.0, 250.0, 120.0);
//! let world = survey::grid_points(3, 3, 10.0);
//! let anchors = survey::anchors_from_transform(&truth, &world, &GaussianPixelNoise::default());
//! assert_eq!(anchors.len(), 9);
//! ```

pub mod noise;
pub mod survey;
