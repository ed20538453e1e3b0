//! Per-cycle contour overlays from projected point clouds.
//!
//! Points are cleaned (NaN dropped, near-duplicates merged at 0.01 px
//! resolution, sorted by x then y) and wrapped with Andrew's monotone chain.
//! A hull that encloses a meaningful area becomes a filled polygon; thinner
//! clouds degrade to a stroke through the sorted points or a single marker.

use std::collections::HashSet;

use hordeform_core::{CycleId, Pt2, Real, cross, is_finite_point};
use serde::{Deserialize, Serialize};

/// Minimum absolute hull area (px²) for a filled overlay.
pub const MIN_FILL_AREA: Real = 1e-3;

/// Geometry of one cycle overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayShape {
    /// Closed convex hull, counter-clockwise in a y-up frame.
    Filled { hull: Vec<Pt2>, area: Real },
    /// Open stroke through the cleaned points.
    Polyline { points: Vec<Pt2> },
    /// Single point marker.
    Marker { point: Pt2 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOverlay {
    pub cycle_id: CycleId,
    pub shape: OverlayShape,
}

impl CycleOverlay {
    pub fn is_filled(&self) -> bool {
        matches!(self.shape, OverlayShape::Filled { .. })
    }
}

/// Round to two decimals, as used for de-duplication keys.
fn round2(v: Real) -> Real {
    // + 0.0 folds -0.0 into 0.0 so both hash alike.
    (v * 100.0).round() / 100.0 + 0.0
}

/// Drop non-finite points, merge points equal at two decimals (first wins)
/// and sort by x, then y.
pub fn dedup_sorted(points: &[Pt2]) -> Vec<Pt2> {
    let mut seen = HashSet::new();
    let mut out: Vec<Pt2> = points
        .iter()
        .filter(|p| is_finite_point(p))
        .filter(|p| seen.insert((round2(p.x).to_bits(), round2(p.y).to_bits())))
        .copied()
        .collect();
    out.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    out
}

/// Monotone chain convex hull of points sorted by x, then y.
///
/// Collinear points are dropped (pop on `cross <= 0`). Returns at most
/// `points.len()` vertices; fewer than three input points are returned as is.
pub fn convex_hull(sorted: &[Pt2]) -> Vec<Pt2> {
    if sorted.len() < 3 {
        return sorted.to_vec();
    }

    let mut lower: Vec<Pt2> = Vec::with_capacity(sorted.len());
    for p in sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Pt2> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Shoelace signed area; 0 for fewer than three vertices.
pub fn signed_area(polygon: &[Pt2]) -> Real {
    if polygon.len() < 3 {
        return 0.0;
    }
    let n = polygon.len();
    let twice: Real = (0..n)
        .map(|i| {
            let p = polygon[i];
            let q = polygon[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    0.5 * twice
}

/// Build the overlay for one cycle from its projected points.
///
/// Returns `None` when no finite point remains.
pub fn build_overlay(cycle_id: CycleId, points: &[Pt2]) -> Option<CycleOverlay> {
    let points = dedup_sorted(points);

    if points.len() >= 3 {
        let hull = convex_hull(&points);
        let area = signed_area(&hull);
        if hull.len() >= 3 && area.abs() > MIN_FILL_AREA {
            return Some(CycleOverlay {
                cycle_id,
                shape: OverlayShape::Filled { hull, area },
            });
        }
    }

    let shape = match points.len() {
        0 => return None,
        1 => OverlayShape::Marker { point: points[0] },
        _ => OverlayShape::Polyline { points },
    };
    Some(CycleOverlay { cycle_id, shape })
}
