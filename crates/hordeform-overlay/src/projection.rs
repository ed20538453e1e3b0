//! Screen-space projection of measurement rows and their displacement arrows.

use std::collections::BTreeMap;

use hordeform_core::{
    CycleId, CycleRows, MeasurementPoint, Pt2, Real, RenderSettings, TransformState, Vec2,
    nan_point, nan_point_as_null,
};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::vector::VectorScaler;

/// Segments shorter than this (pixels) get a single-point head.
const MIN_HEAD_SEGMENT_PX: Real = 1e-6;
/// Head length as a fraction of the segment length, upper bound.
const HEAD_LENGTH_RATIO: Real = 0.4;
/// Half-width of the head base relative to its length.
const HEAD_WIDTH_RATIO: Real = 0.4;

/// A measurement row with its screen-space geometry.
///
/// Rows without world coordinates carry NaN positions and must be skipped by
/// renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedRow {
    pub point: MeasurementPoint,
    /// Projected survey point.
    #[serde(with = "nan_point_as_null")]
    pub screen: Pt2,
    /// Where the point label is anchored.
    #[serde(with = "nan_point_as_null")]
    pub label: Pt2,
    /// Arrow tip; equal to `screen` when there is no vector.
    #[serde(with = "nan_point_as_null")]
    pub arrow_end: Pt2,
    /// Arrowhead polygon: tip and two base points, a single point for a
    /// degenerate segment, or empty when there is no vector.
    pub arrow_head: Vec<Pt2>,
    pub has_vector: bool,
    /// World-space multiplier used for the arrow; 0 without a vector.
    pub multiplier: Real,
}

impl ProjectedRow {
    fn without_world(point: MeasurementPoint) -> Self {
        Self {
            point,
            screen: nan_point(),
            label: nan_point(),
            arrow_end: nan_point(),
            arrow_head: Vec::new(),
            has_vector: false,
            multiplier: 0.0,
        }
    }

    fn without_vector(point: MeasurementPoint, screen: Pt2) -> Self {
        Self {
            point,
            screen,
            label: screen,
            arrow_end: screen,
            arrow_head: Vec::new(),
            has_vector: false,
            multiplier: 0.0,
        }
    }

    /// True if the row has a drawable screen position.
    pub fn is_drawable(&self) -> bool {
        !self.screen.x.is_nan() && !self.screen.y.is_nan()
    }
}

/// Arrowhead polygon for the segment `start → end`.
///
/// The head length is `min(head_size, 0.4·len)`; its base points sit at
/// `±0.4·head` along the segment normal. A segment shorter than `1e-6` px or
/// a zero head size yields the single point `[end]`.
pub fn arrow_head(start: &Pt2, end: &Pt2, head_size: Real) -> Vec<Pt2> {
    let seg = end - start;
    let len = seg.norm();
    if len <= MIN_HEAD_SEGMENT_PX || head_size <= 0.0 {
        return vec![*end];
    }
    let tip = head_size.min(len * HEAD_LENGTH_RATIO);
    let dir = seg / len;
    let normal = Vec2::new(-dir.y, dir.x);
    let back = *end - dir * tip;
    let half = normal * (tip * HEAD_WIDTH_RATIO);
    vec![*end, back + half, back - half]
}

/// Project one row.
///
/// `max_visible` is the largest displacement magnitude among visible rows and
/// `settings` should already be clamped.
pub fn project_row(
    point: &MeasurementPoint,
    transform: &TransformState,
    max_visible: Real,
    settings: &RenderSettings,
) -> ProjectedRow {
    let Some(world) = point.world() else {
        return ProjectedRow::without_world(*point);
    };
    let screen = transform.project(&world);

    let Some(d) = point.displacement() else {
        return ProjectedRow::without_vector(*point, screen);
    };
    let magnitude = d.norm();
    if !VectorScaler::is_drawable(magnitude) {
        return ProjectedRow::without_vector(*point, screen);
    }

    let k = VectorScaler::effective_multiplier(magnitude, max_visible, transform.scale, settings);
    let arrow_end = transform.project(&(world + d * k));
    let arrow_head = arrow_head(&screen, &arrow_end, settings.arrow_head_size_px);

    ProjectedRow {
        point: *point,
        screen,
        label: screen,
        arrow_end,
        arrow_head,
        has_vector: true,
        multiplier: k,
    }
}

/// Project a batch of rows with one settings snapshot.
pub fn recompute(
    rows: &[MeasurementPoint],
    transform: &TransformState,
    max_visible: Real,
    settings: &RenderSettings,
) -> Vec<ProjectedRow> {
    let settings = settings.clamped();
    rows.iter()
        .map(|p| project_row(p, transform, max_visible, &settings))
        .collect()
}

/// Projected rows of one object grouped by cycle, rebuilt lazily.
///
/// Any input change (transform, settings, visible set) should call
/// [`mark_dirty`](Self::mark_dirty); the next [`ensure`](Self::ensure)
/// rebuilds every cycle in one pass.
#[derive(Debug, Clone)]
pub struct RowProjectionCache {
    rows: BTreeMap<CycleId, Vec<ProjectedRow>>,
    dirty: bool,
}

impl Default for RowProjectionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RowProjectionCache {
    /// Empty cache that needs a rebuild.
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Unconditionally rebuild from `cycles`.
    pub fn recompute(
        &mut self,
        cycles: &CycleRows,
        transform: &TransformState,
        max_visible: Real,
        settings: &RenderSettings,
    ) {
        self.rows = cycles
            .iter()
            .map(|(&cycle, rows)| (cycle, recompute(rows, transform, max_visible, settings)))
            .collect();
        self.dirty = false;
        debug!(
            "projected {} rows over {} cycles ({transform})",
            self.row_count(),
            self.rows.len()
        );
    }

    /// Rebuild if dirty. Returns `true` if a rebuild happened.
    pub fn ensure(
        &mut self,
        cycles: &CycleRows,
        transform: &TransformState,
        max_visible: Real,
        settings: &RenderSettings,
    ) -> bool {
        if !self.dirty {
            return false;
        }
        self.recompute(cycles, transform, max_visible, settings);
        true
    }

    /// Rows of `cycle`; empty if the cycle is unknown.
    pub fn rows_for_cycle(&self, cycle: CycleId) -> &[ProjectedRow] {
        self.rows.get(&cycle).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Screen positions of `cycle` (NaN entries included).
    pub fn screen_points(&self, cycle: CycleId) -> Vec<Pt2> {
        self.rows_for_cycle(cycle).iter().map(|r| r.screen).collect()
    }

    pub fn cycle_ids(&self) -> impl Iterator<Item = CycleId> + '_ {
        self.rows.keys().copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// Drop all rows and mark dirty.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_settings() -> RenderSettings {
        RenderSettings {
            vector_scale_base: 10.0,
            use_relative_weight: false,
            ..RenderSettings::default()
        }
    }

    #[test]
    fn row_without_world_is_nan() {
        let p = MeasurementPoint::new(Some(1), 1).with_displacement(1.0, 1.0);
        let r = project_row(&p, &TransformState::IDENTITY, 1.0, &plain_settings());
        assert!(!r.has_vector);
        assert!(r.screen.x.is_nan() && r.label.y.is_nan() && r.arrow_end.x.is_nan());
        assert!(r.arrow_head.is_empty());
        assert!(!r.is_drawable());
    }

    #[test]
    fn row_without_displacement_ends_at_screen() {
        let p = MeasurementPoint::new(Some(1), 1).with_world(2.0, 3.0);
        let t = TransformState::new(2.0, 0.0, 1.0, 1.0);
        let r = project_row(&p, &t, 1.0, &plain_settings());
        assert_eq!(r.screen, Pt2::new(5.0, 7.0));
        assert_eq!(r.arrow_end, r.screen);
        assert_eq!(r.label, r.screen);
        assert!(r.arrow_head.is_empty());
        assert!(!r.has_vector);
    }

    #[test]
    fn tiny_displacement_is_not_a_vector() {
        let p = MeasurementPoint::new(None, 1)
            .with_world(0.0, 0.0)
            .with_displacement(1e-12, 0.0);
        let r = project_row(&p, &TransformState::IDENTITY, 1.0, &plain_settings());
        assert!(!r.has_vector);
        assert_eq!(r.arrow_end, r.screen);
    }

    #[test]
    fn arrow_end_uses_multiplier() {
        let p = MeasurementPoint::new(Some(4), 1)
            .with_world(1.0, 1.0)
            .with_displacement(0.5, 0.0);
        let t = TransformState::new(2.0, 0.0, 0.0, 0.0);
        let r = project_row(&p, &t, 0.5, &plain_settings());
        assert!(r.has_vector);
        assert_eq!(r.multiplier, 10.0);
        // world end (1 + 0.5·10, 1) scaled by 2
        assert!((r.arrow_end.x - 12.0).abs() < 1e-12);
        assert!((r.arrow_end.y - 2.0).abs() < 1e-12);
        assert_eq!(r.arrow_head.len(), 3);
        assert_eq!(r.arrow_head[0], r.arrow_end);
    }

    #[test]
    fn head_geometry() {
        let head = arrow_head(&Pt2::new(0.0, 0.0), &Pt2::new(100.0, 0.0), 12.0);
        assert_eq!(head[0], Pt2::new(100.0, 0.0));
        assert!((head[1].x - 88.0).abs() < 1e-12);
        assert!((head[1].y - 4.8).abs() < 1e-12);
        assert!((head[2].x - 88.0).abs() < 1e-12);
        assert!((head[2].y + 4.8).abs() < 1e-12);
    }

    #[test]
    fn head_shrinks_on_short_segments() {
        let head = arrow_head(&Pt2::new(0.0, 0.0), &Pt2::new(0.0, 10.0), 12.0);
        // tip = 0.4 · 10
        assert!((head[1].y - 6.0).abs() < 1e-12);
        assert!((head[1].x + 1.6).abs() < 1e-12);
    }

    #[test]
    fn degenerate_head_is_single_point() {
        let end = Pt2::new(5.0, 5.0);
        assert_eq!(arrow_head(&end, &end, 12.0), vec![end]);
        assert_eq!(arrow_head(&Pt2::new(0.0, 0.0), &end, 0.0), vec![end]);
    }

    #[test]
    fn cache_is_lazy() {
        let mut cycles = CycleRows::new();
        cycles.insert(
            2,
            vec![MeasurementPoint::new(Some(1), 2).with_world(1.0, 0.0)],
        );
        let mut cache = RowProjectionCache::new();
        assert!(cache.is_dirty());
        let t = TransformState::new(3.0, 0.0, 0.0, 0.0);
        assert!(cache.ensure(&cycles, &t, 0.0, &plain_settings()));
        assert!(!cache.ensure(&cycles, &t, 0.0, &plain_settings()));
        assert_eq!(cache.rows_for_cycle(2)[0].screen, Pt2::new(3.0, 0.0));
        assert!(cache.rows_for_cycle(9).is_empty());

        cache.mark_dirty();
        let t2 = TransformState::new(1.0, 0.0, 0.0, 0.0);
        assert!(cache.ensure(&cycles, &t2, 0.0, &plain_settings()));
        assert_eq!(cache.screen_points(2), vec![Pt2::new(1.0, 0.0)]);
    }
}
