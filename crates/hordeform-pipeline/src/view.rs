//! Deformation diagram view: rows, overlays and calibration in one place.
//!
//! [`DeformationView`] ties a [`RowProvider`] to a [`CalibrationSession`],
//! a [`CycleSelection`] and a [`SettingsSnapshot`]. Geometry is kept in two
//! cache layers, projected rows and cycle overlays, each guarded by a dirty
//! flag. Mutators only mark layers dirty; the next read rebuilds them.
//!
//! Transform changes are detected through [`CalibrationSession::revision`]
//! and settings changes through [`SettingsSnapshot::version`], so callers
//! may drive the session directly via [`DeformationView::session_mut`].

use anyhow::Result;
use hordeform_core::{
    CycleId, CycleRows, MeasurementPoint, ObjectId, Pt2, Real, RenderSettings, RowProvider,
    ScreenRect, SettingsSnapshot, TransformState,
};
use hordeform_overlay::{
    CycleOverlay, CycleSelection, DisplayMode, ProjectedRow, RowProjectionCache, build_overlay,
    max_visible_magnitude,
};
use log::{debug, info};

use crate::session::CalibrationSession;

pub struct DeformationView<P: RowProvider> {
    provider: P,
    object: Option<ObjectId>,
    selection: CycleSelection,
    settings: SettingsSnapshot,
    session: CalibrationSession,
    grid_filter: Option<CycleId>,

    max_visible: Real,
    rows: RowProjectionCache,
    overlays: Vec<CycleOverlay>,
    overlays_dirty: bool,
    seen_revision: u64,
    seen_settings_version: u64,
}

impl<P: RowProvider> DeformationView<P> {
    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    /// View over `provider` showing its first object with default settings.
    pub fn new(provider: P) -> Self {
        Self::with_session(provider, CalibrationSession::new())
    }

    /// View over `provider` driven by an existing session.
    pub fn with_session(provider: P, session: CalibrationSession) -> Self {
        let settings = SettingsSnapshot::default();
        let mut view = Self {
            object: provider.object_ids().first().copied(),
            provider,
            selection: CycleSelection::default(),
            seen_revision: session.revision(),
            seen_settings_version: settings.version,
            settings,
            session,
            grid_filter: None,
            max_visible: 0.0,
            rows: RowProjectionCache::new(),
            overlays: Vec::new(),
            overlays_dirty: true,
        };
        view.rebuild_cycles();
        view
    }

    /// Swap in new measurement data, keeping the selected object if it
    /// still exists.
    pub fn set_provider(&mut self, provider: P) {
        self.provider = provider;
        let ids = self.provider.object_ids();
        if !self.object.is_some_and(|o| ids.contains(&o)) {
            self.object = ids.first().copied();
        }
        self.rebuild_cycles();
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Object and Cycle Selection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn objects(&self) -> Vec<ObjectId> {
        self.provider.object_ids()
    }

    pub fn selected_object(&self) -> Option<ObjectId> {
        self.object
    }

    /// Show `object`; all of its cycles start selected. Returns `false` for
    /// an unknown or already selected object.
    pub fn select_object(&mut self, object: ObjectId) -> bool {
        if self.object == Some(object) || self.provider.cycles(object).is_none() {
            return false;
        }
        self.object = Some(object);
        self.rebuild_cycles();
        true
    }

    pub fn cycle_selection(&self) -> &CycleSelection {
        &self.selection
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.selection.mode()
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) -> bool {
        let changed = self.selection.set_mode(mode);
        if changed {
            self.visible_set_changed();
        }
        changed
    }

    pub fn set_cycle_selected(&mut self, cycle: CycleId, selected: bool) -> bool {
        let changed = self.selection.set_selected(cycle, selected);
        if changed {
            self.visible_set_changed();
        }
        changed
    }

    /// Select exactly `cycles`.
    pub fn select_cycles(&mut self, cycles: &[CycleId]) -> bool {
        let changed = self.selection.select_only(cycles);
        if changed {
            self.visible_set_changed();
        }
        changed
    }

    pub fn cycles_summary(&self) -> String {
        self.selection.summary()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settings and Session
    // ─────────────────────────────────────────────────────────────────────────

    pub fn settings(&self) -> &SettingsSnapshot {
        &self.settings
    }

    /// Replace the render settings.
    ///
    /// # Errors
    ///
    /// Returns an error (keeping the old settings) if validation fails.
    pub fn replace_settings(&mut self, settings: RenderSettings) -> Result<()> {
        self.settings.replace(settings)
    }

    /// Update the render settings in place.
    ///
    /// # Errors
    ///
    /// Returns an error (keeping the old settings) if validation fails.
    pub fn update_settings<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut RenderSettings),
    {
        self.settings.update(f)
    }

    pub fn session(&self) -> &CalibrationSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CalibrationSession {
        &mut self.session
    }

    pub fn transform(&self) -> TransformState {
        self.session.transform()
    }

    /// Rectangle pick over the visible rows with world coordinates.
    ///
    /// See [`CalibrationSession::add_anchors_in_rect`].
    pub fn add_anchors_in_rect(&mut self, rect: &ScreenRect) -> usize {
        let candidates: Vec<Pt2> = self
            .visible_rows()
            .iter()
            .filter_map(MeasurementPoint::world)
            .collect();
        self.session.add_anchors_in_rect(rect, candidates)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Row Queries
    // ─────────────────────────────────────────────────────────────────────────

    fn object_cycles(&self) -> Option<&CycleRows> {
        self.object.and_then(|o| self.provider.cycles(o))
    }

    /// Rows of the visible cycles, in ascending cycle order.
    pub fn visible_rows(&self) -> Vec<MeasurementPoint> {
        let Some(cycles) = self.object_cycles() else {
            return Vec::new();
        };
        self.selection
            .row_cycles()
            .into_iter()
            .filter_map(|c| cycles.get(&c))
            .flatten()
            .copied()
            .collect()
    }

    /// Largest displacement magnitude among the visible rows.
    pub fn max_visible_magnitude(&self) -> Real {
        self.max_visible
    }

    /// Restrict [`grid_rows`](Self::grid_rows) to one cycle, or `None` for all.
    pub fn set_grid_filter(&mut self, cycle: Option<CycleId>) {
        self.grid_filter = cycle;
    }

    pub fn grid_filter(&self) -> Option<CycleId> {
        self.grid_filter
    }

    /// Visible rows passing the grid cycle filter, for tabular display.
    pub fn grid_rows(&self) -> Vec<MeasurementPoint> {
        self.visible_rows()
            .into_iter()
            .filter(|r| self.grid_filter.is_none_or(|c| r.cycle_id == c))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cached Geometry
    // ─────────────────────────────────────────────────────────────────────────

    /// Projected rows of every cycle of the selected object.
    pub fn projection(&mut self) -> &RowProjectionCache {
        self.ensure_rows();
        &self.rows
    }

    /// Projected rows of the visible cycles, in ascending cycle order.
    pub fn projected_rows(&mut self) -> Vec<ProjectedRow> {
        self.ensure_rows();
        self.selection
            .row_cycles()
            .into_iter()
            .flat_map(|c| self.rows.rows_for_cycle(c).iter().cloned())
            .collect()
    }

    /// Contour overlays of the overlay-visible cycles.
    pub fn overlays(&mut self) -> &[CycleOverlay] {
        self.ensure_rows();
        if self.overlays_dirty {
            self.overlays = self
                .selection
                .overlay_cycles()
                .into_iter()
                .filter_map(|c| build_overlay(c, &self.rows.screen_points(c)))
                .collect();
            self.overlays_dirty = false;
            debug!("rebuilt {} cycle overlays", self.overlays.len());
        }
        &self.overlays
    }

    /// True if a read would rebuild cached geometry.
    pub fn is_dirty(&self) -> bool {
        self.rows.is_dirty()
            || self.overlays_dirty
            || self.session.revision() != self.seen_revision
            || self.settings.version != self.seen_settings_version
    }

    /// Bring both layers up to date now.
    pub fn refresh(&mut self) {
        self.overlays();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invalidation
    // ─────────────────────────────────────────────────────────────────────────

    fn rebuild_cycles(&mut self) {
        let ids: Vec<CycleId> = self
            .object_cycles()
            .map(|c| c.keys().copied().collect())
            .unwrap_or_default();
        let mode = self.selection.mode();
        self.selection = CycleSelection::from_cycles(ids);
        self.selection.set_mode(mode);
        info!("object {:?}: {}", self.object, self.selection.summary());
        self.visible_set_changed();
    }

    fn visible_set_changed(&mut self) {
        self.max_visible = max_visible_magnitude(&self.visible_rows());
        self.rows.mark_dirty();
        self.overlays_dirty = true;
    }

    /// Pick up session and settings changes since the last read.
    fn sync(&mut self) {
        let revision = self.session.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.rows.mark_dirty();
        }
        if self.settings.version != self.seen_settings_version {
            self.seen_settings_version = self.settings.version;
            self.rows.mark_dirty();
        }
    }

    fn ensure_rows(&mut self) {
        self.sync();
        let empty = CycleRows::new();
        let cycles = self
            .object
            .and_then(|o| self.provider.cycles(o))
            .unwrap_or(&empty);
        let transform = self.session.transform();
        if self
            .rows
            .ensure(cycles, &transform, self.max_visible, &self.settings.settings)
        {
            self.overlays_dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hordeform_core::InMemoryRows;

    fn provider() -> InMemoryRows {
        InMemoryRows::from_rows([
            (1, MeasurementPoint::new(Some(1), 1).with_world(0.0, 0.0).with_displacement(0.1, 0.0)),
            (1, MeasurementPoint::new(Some(2), 1).with_world(10.0, 0.0).with_displacement(0.2, 0.0)),
            (1, MeasurementPoint::new(Some(1), 2).with_world(0.0, 0.0).with_displacement(0.4, 0.0)),
            (1, MeasurementPoint::new(Some(3), 2)),
            (5, MeasurementPoint::new(Some(1), 1).with_world(1.0, 1.0)),
        ])
    }

    #[test]
    fn first_object_selected_with_all_cycles() {
        let view = DeformationView::new(provider());
        assert_eq!(view.selected_object(), Some(1));
        assert_eq!(view.cycles_summary(), "Cycles: all (2)");
        assert_eq!(view.visible_rows().len(), 4);
        assert!((view.max_visible_magnitude() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn toggles_change_max_visible() {
        let mut view = DeformationView::new(provider());
        assert!(view.set_cycle_selected(2, false));
        assert!((view.max_visible_magnitude() - 0.2).abs() < 1e-12);
        assert!(view.set_display_mode(DisplayMode::LastCycle));
        assert_eq!(view.visible_rows().len(), 2);
        assert!((view.max_visible_magnitude() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn grid_filter_restricts_rows() {
        let mut view = DeformationView::new(provider());
        view.set_grid_filter(Some(2));
        assert!(view.grid_rows().iter().all(|r| r.cycle_id == 2));
        assert_eq!(view.grid_rows().len(), 2);
        view.set_grid_filter(None);
        assert_eq!(view.grid_rows().len(), 4);
    }

    #[test]
    fn session_changes_mark_rows_dirty() {
        let mut view = DeformationView::new(provider());
        view.refresh();
        assert!(!view.is_dirty());

        view.session_mut().rotate_right_90();
        assert!(view.is_dirty());
        let rows = view.projected_rows();
        // (10, 0) rotated a quarter turn lands on (0, 10).
        assert!(rows[1].screen.x.abs() < 1e-9);
        assert!((rows[1].screen.y - 10.0).abs() < 1e-9);
        view.refresh();
        assert!(!view.is_dirty());
    }

    #[test]
    fn settings_changes_mark_rows_dirty() {
        let mut view = DeformationView::new(provider());
        view.refresh();
        view.update_settings(|s| s.vector_scale_base = 5.0).unwrap();
        assert!(view.is_dirty());
        let k = view.projected_rows()[2].multiplier;
        // Cycle 2, magnitude 0.4 = max visible.
        assert!((k - 5.0).abs() < 1e-12);
    }

    #[test]
    fn switching_objects_resets_cycles() {
        let mut view = DeformationView::new(provider());
        view.set_cycle_selected(1, false);
        assert!(view.select_object(5));
        assert!(!view.select_object(5));
        assert!(!view.select_object(99));
        assert_eq!(view.cycles_summary(), "Cycles: all (1)");
        assert_eq!(view.max_visible_magnitude(), 0.0);
        let overlays = view.overlays().to_vec();
        assert_eq!(overlays.len(), 1);
        assert!(!overlays[0].is_filled());
    }
}
