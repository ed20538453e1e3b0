//! Screen-space geometry for displacement diagrams.
//!
//! Given the current [`TransformState`](hordeform_core::TransformState) and a
//! [`RenderSettings`](hordeform_core::RenderSettings) snapshot, this crate
//! turns measurement rows into drawable geometry:
//!
//! - [`vector`]: adaptive arrow multiplier with relative weighting and pixel clamps,
//! - [`projection`]: per-row screen point, arrow end and arrowhead, cached by cycle,
//! - [`contour`]: per-cycle convex hull overlays with stroke/marker fallbacks,
//! - [`visibility`]: display mode and cycle toggles deciding what is shown.
//!
//! Nothing here paints; a rendering layer consumes the coordinates.

pub mod contour;
pub mod projection;
pub mod vector;
pub mod visibility;

pub use contour::{CycleOverlay, OverlayShape, build_overlay, convex_hull, dedup_sorted, signed_area};
pub use projection::{ProjectedRow, RowProjectionCache, arrow_head, project_row};
pub use vector::{MIN_VECTOR_MAGNITUDE, VectorScaler, effective_multiplier};
pub use visibility::{CycleSelection, CycleToggle, DisplayMode, max_visible_magnitude};
