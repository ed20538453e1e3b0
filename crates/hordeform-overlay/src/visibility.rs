//! Which cycles are shown as rows and as contour overlays.

use hordeform_core::{CycleId, MeasurementPoint, Real};
use serde::{Deserialize, Serialize};

/// Cycle display policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Every cycle, regardless of toggles.
    AllCycles,
    /// Only the cycle with the largest id.
    LastCycle,
    /// Cycles whose toggle is on.
    #[default]
    SelectedCycles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleToggle {
    pub id: CycleId,
    pub selected: bool,
}

/// Display mode plus one toggle per known cycle, kept in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleSelection {
    mode: DisplayMode,
    toggles: Vec<CycleToggle>,
}

impl CycleSelection {
    /// Toggles for `ids`, all selected; duplicates are merged.
    pub fn from_cycles<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = CycleId>,
    {
        let mut ids: Vec<CycleId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self {
            mode: DisplayMode::default(),
            toggles: ids
                .into_iter()
                .map(|id| CycleToggle { id, selected: true })
                .collect(),
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Returns `true` if the mode changed.
    pub fn set_mode(&mut self, mode: DisplayMode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    pub fn toggles(&self) -> &[CycleToggle] {
        &self.toggles
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }

    pub fn is_selected(&self, id: CycleId) -> bool {
        self.toggles.iter().any(|t| t.id == id && t.selected)
    }

    /// Flip one toggle. Returns `true` if something changed; unknown ids
    /// are ignored.
    pub fn set_selected(&mut self, id: CycleId, selected: bool) -> bool {
        match self.toggles.iter_mut().find(|t| t.id == id) {
            Some(t) if t.selected != selected => {
                t.selected = selected;
                true
            }
            _ => false,
        }
    }

    /// Select exactly the cycles in `ids`. Returns `true` if any toggle changed.
    pub fn select_only(&mut self, ids: &[CycleId]) -> bool {
        let mut changed = false;
        for t in &mut self.toggles {
            let selected = ids.contains(&t.id);
            changed |= t.selected != selected;
            t.selected = selected;
        }
        changed
    }

    /// Largest cycle id, or 0 without cycles.
    pub fn last_cycle(&self) -> CycleId {
        self.toggles.last().map_or(0, |t| t.id)
    }

    /// Cycles whose rows are visible, ascending.
    ///
    /// In [`DisplayMode::LastCycle`] this is only the last cycle, provided
    /// its id is positive; otherwise the toggles decide.
    pub fn row_cycles(&self) -> Vec<CycleId> {
        let last = self.last_cycle();
        if self.mode == DisplayMode::LastCycle && last > 0 {
            return vec![last];
        }
        self.toggles
            .iter()
            .filter(|t| self.mode == DisplayMode::AllCycles || t.selected)
            .map(|t| t.id)
            .collect()
    }

    /// Cycles that get a contour overlay, ascending.
    ///
    /// Selected cycles keep their overlay in [`DisplayMode::LastCycle`].
    pub fn overlay_cycles(&self) -> Vec<CycleId> {
        let last = self.last_cycle();
        self.toggles
            .iter()
            .filter(|t| {
                self.mode == DisplayMode::AllCycles
                    || t.selected
                    || (self.mode == DisplayMode::LastCycle && t.id == last)
            })
            .map(|t| t.id)
            .collect()
    }

    /// Short human summary of the toggles, e.g. `"Cycles: 1, 3"`.
    pub fn summary(&self) -> String {
        if self.toggles.is_empty() {
            return "Cycles: —".to_string();
        }
        if self.toggles.iter().all(|t| t.selected) {
            return format!("Cycles: all ({})", self.toggles.len());
        }
        let selected: Vec<String> = self
            .toggles
            .iter()
            .filter(|t| t.selected)
            .map(|t| t.id.to_string())
            .collect();
        if selected.is_empty() {
            "Cycles: none".to_string()
        } else {
            format!("Cycles: {}", selected.join(", "))
        }
    }
}

/// Largest displacement magnitude among `rows`; rows without a displacement
/// count as 0.
pub fn max_visible_magnitude<'a, I>(rows: I) -> Real
where
    I: IntoIterator<Item = &'a MeasurementPoint>,
{
    rows.into_iter()
        .map(|r| r.magnitude().unwrap_or(0.0))
        .fold(0.0, Real::max)
}
