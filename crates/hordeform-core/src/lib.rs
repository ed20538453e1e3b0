//! Core geometry primitives for `hordeform`.
//!
//! This crate provides the building blocks shared by the fitting, overlay
//! and pipeline crates:
//!
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt2`) and a screen rectangle,
//! - the world → image similarity transform ([`TransformState`]) and its projector,
//! - control-point correspondences ([`Anchor`], [`AnchorSet`]),
//! - measurement rows and the read-only [`RowProvider`] query interface,
//! - the immutable [`RenderSettings`] snapshot consumed by vector scaling.
//!
//! Projection model:
//! `u = a·x − b·y + tx`, `v = b·x + a·y + ty` with `a = s·cos θ`, `b = s·sin θ`.
//!
//! # Example
//!
//! ```
//! use hordeform_core::TransformState;
//!
//! let t = TransformState::new(10.0, 0.0, 100.0, 100.0);
//! let (u, v) = t.to_screen(5.0, 5.0);
//! assert!((u - 150.0).abs() < 1e-12);
//! assert!((v - 150.0).abs() < 1e-12);
//! ```

/// Control-point correspondences between world and image space.
mod anchor;
/// Linear algebra type aliases and small geometric helpers.
mod math;
/// Measurement rows and the row provider interface.
mod measurement;
/// Axis-aligned screen rectangle used by rectangular selection.
mod rect;
/// Vector display settings snapshot.
mod settings;
/// World → image similarity transform.
mod transform;

/// Deterministic synthetic data generation helpers.
///
/// Small, reusable building blocks for constructing synthetic calibration
/// problems (known transforms, anchor grids, deterministic noise). Used in
/// workspace tests and useful for regression testing of downstream hosts.
pub mod synthetic;

pub use anchor::*;
pub use math::*;
pub use measurement::*;
pub use rect::*;
pub use settings::*;
pub use transform::*;
