//! Closed-form estimation of the world → image similarity transform.
//!
//! - [`solve`]: small dense Gauss–Jordan solver with partial pivoting.
//! - [`similarity`]: normal-equation least squares for `(a, b, tx, ty)` and
//!   per-anchor residuals.

pub mod similarity;
pub mod solve;

pub use similarity::*;
pub use solve::*;
