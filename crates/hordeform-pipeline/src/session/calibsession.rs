//! Build-mode calibration session.
//!
//! The session owns the live [`TransformState`] and the anchors placed while
//! calibrating. Entering build mode snapshots the transform; every anchor
//! edit refits the similarity and either installs the fitted transform or
//! falls back to the snapshot. Accept keeps the result, cancel restores the
//! snapshot.
//!
//! ```text
//! Idle ──enter_build_mode──▶ BuildMode ──accept──▶ Idle
//!                               │
//!                               └──────cancel─────▶ Idle (snapshot restored)
//! ```
//!
//! Invalid transitions are no-ops that return `false`.

use anyhow::{Result, bail};
use hordeform_core::{Anchor, AnchorSet, Pt2, Real, ScreenRect, TransformState};
use hordeform_linear::{FitError, MIN_ANCHORS, SimilarityFitter};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::types::{LogEntry, SessionMetadata, SessionOp};

/// Session kind written to [`SessionMetadata`].
pub const SESSION_KIND: &str = "hordeform_calibration";
/// Current serialized schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// World-space distance under which a rectangle pick duplicates an anchor.
pub const DUPLICATE_WORLD_TOLERANCE: Real = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    BuildMode,
}

/// Anchor placement tool active in build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildTool {
    /// Click an image pixel and type its world coordinates.
    #[default]
    Point,
    /// Drag a rectangle; visible points inside become anchors.
    Rect,
}

/// Outcome of the most recent refit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitStatus {
    /// No fit ran (idle session or nothing changed).
    #[default]
    Inactive,
    /// The fitted transform is live.
    Fitted { rms: Real, anchors: usize },
    /// The fit failed; the snapshot transform is live.
    Reverted { reason: FitError },
}

impl FitStatus {
    pub fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted { .. })
    }
}

/// Calibration session with a build-mode lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSession {
    /// Session metadata (kind, schema version, timestamps, description).
    pub metadata: SessionMetadata,

    /// Live world → image transform.
    transform: TransformState,

    /// Transform captured on entering build mode.
    saved: TransformState,

    state: SessionState,
    tool: BuildTool,
    anchors: AnchorSet,

    /// RMS of the last successful fit; 0 otherwise.
    rms: Real,
    last_fit: FitStatus,

    /// Bumped once per transition that changes the transform or anchors.
    revision: u64,

    /// Operation log (lightweight audit trail).
    pub log: Vec<LogEntry>,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationSession {
    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Idle session with the identity transform.
    pub fn new() -> Self {
        Self::with_transform(TransformState::IDENTITY)
    }

    /// Idle session starting from `transform`.
    pub fn with_transform(transform: TransformState) -> Self {
        Self {
            metadata: SessionMetadata::new(SESSION_KIND, SCHEMA_VERSION),
            transform,
            saved: transform,
            state: SessionState::Idle,
            tool: BuildTool::Point,
            anchors: AnchorSet::new(),
            rms: 0.0,
            last_fit: FitStatus::Inactive,
            revision: 0,
            log: Vec::new(),
        }
    }

    pub fn with_description(description: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.metadata = SessionMetadata::new(SESSION_KIND, SCHEMA_VERSION).describe(description);
        session
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn transform(&self) -> TransformState {
        self.transform
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_building(&self) -> bool {
        self.state == SessionState::BuildMode
    }

    pub fn tool(&self) -> BuildTool {
        self.tool
    }

    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    pub fn rms(&self) -> Real {
        self.rms
    }

    pub fn last_fit(&self) -> FitStatus {
        self.last_fit
    }

    /// Change counter for caches that depend on the transform.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Snapshot that cancel would restore, while building.
    pub fn saved_transform(&self) -> Option<TransformState> {
        self.is_building().then_some(self.saved)
    }

    /// True when accept is allowed: building, at least two world anchors and
    /// the live transform comes from a successful fit of them.
    pub fn can_accept(&self) -> bool {
        self.is_building()
            && self.anchors.world_count() >= MIN_ANCHORS
            && self.last_fit.is_fitted()
    }

    /// Human summary of the current fit quality.
    pub fn rms_info(&self) -> String {
        let n = self.anchors.world_count();
        if n >= MIN_ANCHORS {
            format!("RMS: {:.2}px ({n} anchors)", self.rms)
        } else {
            format!("Select at least {MIN_ANCHORS} anchors")
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Build-mode Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a calibration build. Returns `false` if already building.
    pub fn enter_build_mode(&mut self) -> bool {
        if self.is_building() {
            debug!("enter_build_mode ignored: already building");
            return false;
        }
        self.saved = self.transform;
        self.anchors.clear();
        self.rms = 0.0;
        self.last_fit = FitStatus::Inactive;
        self.tool = BuildTool::Point;
        self.state = SessionState::BuildMode;
        self.bump();
        info!("entered build mode, snapshot {}", self.saved);
        self.record(LogEntry::ok(SessionOp::EnterBuild, self.revision));
        true
    }

    /// Keep the fitted transform and leave build mode.
    ///
    /// Requires at least two anchors with world coordinates and a successful
    /// last fit.
    pub fn accept(&mut self) -> bool {
        if !self.can_accept() {
            debug!(
                "accept ignored: state={:?}, world anchors={}",
                self.state,
                self.anchors.world_count()
            );
            return false;
        }
        self.state = SessionState::Idle;
        self.bump();
        info!("accepted calibration {} ({})", self.transform, self.rms_info());
        let entry = LogEntry::ok(SessionOp::Accept, self.revision).with_notes(self.rms_info());
        self.record(entry);
        true
    }

    /// Restore the snapshot, drop all anchors and leave build mode.
    pub fn cancel(&mut self) -> bool {
        if !self.is_building() {
            debug!("cancel ignored: not building");
            return false;
        }
        self.transform = self.saved;
        self.anchors.clear();
        self.rms = 0.0;
        self.last_fit = FitStatus::Inactive;
        self.state = SessionState::Idle;
        self.bump();
        info!("cancelled build, restored {}", self.transform);
        self.record(LogEntry::ok(SessionOp::Cancel, self.revision));
        true
    }

    /// Select the anchor placement tool. Returns `false` outside build mode.
    pub fn set_tool(&mut self, tool: BuildTool) -> bool {
        if !self.is_building() {
            return false;
        }
        self.tool = tool;
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Anchor Editing
    // ─────────────────────────────────────────────────────────────────────────

    /// Add an anchor with both coordinates and refit.
    pub fn add_anchor(
        &mut self,
        image_u: Real,
        image_v: Real,
        world_x: Real,
        world_y: Real,
    ) -> FitStatus {
        if !self.is_building() {
            debug!("add_anchor ignored: not building");
            return FitStatus::Inactive;
        }
        self.anchors.push(Anchor::new(image_u, image_v, world_x, world_y));
        self.refit()
    }

    /// Add an image pick whose world coordinates come later.
    ///
    /// Does not refit; returns the new anchor's index.
    pub fn add_anchor_image_only(&mut self, image_u: Real, image_v: Real) -> Option<usize> {
        if !self.is_building() {
            return None;
        }
        self.anchors.push(Anchor::image_only(image_u, image_v));
        self.bump();
        Some(self.anchors.len() - 1)
    }

    /// Assign or edit the world coordinates of anchor `index` and refit.
    pub fn set_anchor_world(&mut self, index: usize, world_x: Real, world_y: Real) -> FitStatus {
        if !self.is_building() {
            return FitStatus::Inactive;
        }
        let Some(anchor) = self.anchors.get_mut(index) else {
            warn!("set_anchor_world: no anchor at index {index}");
            return FitStatus::Inactive;
        };
        anchor.set_world(world_x, world_y);
        self.refit()
    }

    /// Remove anchor `index` and refit.
    pub fn remove_anchor(&mut self, index: usize) -> FitStatus {
        if !self.is_building() || self.anchors.remove(index).is_none() {
            return FitStatus::Inactive;
        }
        self.refit()
    }

    /// Drop every anchor; the refit reverts to the snapshot.
    pub fn clear_anchors(&mut self) -> FitStatus {
        if !self.is_building() {
            return FitStatus::Inactive;
        }
        self.anchors.clear();
        self.rms = 0.0;
        self.refit()
    }

    /// Turn every candidate world point whose current projection falls in
    /// `rect` into an anchor at that projection.
    ///
    /// Candidates within [`DUPLICATE_WORLD_TOLERANCE`] of an existing anchor
    /// are skipped silently. Refits only if something was added; returns the
    /// number of anchors added.
    pub fn add_anchors_in_rect<I>(&mut self, rect: &ScreenRect, candidates: I) -> usize
    where
        I: IntoIterator<Item = Pt2>,
    {
        if !self.is_building() {
            return 0;
        }
        let mut added = 0;
        for world in candidates {
            let (u, v) = self.transform.to_screen(world.x, world.y);
            if !rect.contains(u, v)
                || self
                    .anchors
                    .contains_world(world.x, world.y, DUPLICATE_WORLD_TOLERANCE)
            {
                continue;
            }
            self.anchors.push(Anchor::new(u, v, world.x, world.y));
            added += 1;
        }
        if added > 0 {
            debug!("rectangle pick added {added} anchors");
            self.refit();
        }
        added
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Manual Transform Adjustments
    // ─────────────────────────────────────────────────────────────────────────

    /// Rotate the live transform by `degrees`. Valid in any state.
    pub fn rotate_by(&mut self, degrees: Real) {
        self.transform.rotate_by(degrees);
        self.bump();
        let entry = LogEntry::ok(SessionOp::Rotate, self.revision).with_notes(format!("{degrees:+}°"));
        self.record(entry);
    }

    pub fn rotate_left_90(&mut self) {
        self.rotate_by(-90.0);
    }

    pub fn rotate_right_90(&mut self) {
        self.rotate_by(90.0);
    }

    /// Reset the live transform to identity. Valid in any state.
    pub fn reset_transform(&mut self) {
        self.transform.reset();
        self.bump();
        self.record(LogEntry::ok(SessionOp::ResetTransform, self.revision));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fitting
    // ─────────────────────────────────────────────────────────────────────────

    /// Refit from the current anchors; one revision bump per call.
    fn refit(&mut self) -> FitStatus {
        let (status, entry) = match SimilarityFitter::fit(self.anchors.as_mut_slice()) {
            Ok(result) => {
                self.transform = result.transform;
                self.rms = result.rms;
                info!(
                    "fit {} rms={:.3}px over {} anchors",
                    result.transform, result.rms, result.anchors_used
                );
                let status = FitStatus::Fitted {
                    rms: result.rms,
                    anchors: result.anchors_used,
                };
                (status, Ok(format!("rms={:.4}px", result.rms)))
            }
            Err(reason) => {
                self.transform = self.saved;
                self.anchors.clear_predictions();
                self.rms = 0.0;
                match reason {
                    FitError::InsufficientAnchors(_) => debug!("fit skipped: {reason}"),
                    _ => warn!("fit failed, reverted to snapshot: {reason}"),
                }
                (FitStatus::Reverted { reason }, Err(reason.to_string()))
            }
        };
        self.last_fit = status;
        self.bump();
        let entry = match entry {
            Ok(notes) => LogEntry::ok(SessionOp::Fit, self.revision).with_notes(notes),
            Err(error) => LogEntry::failed(SessionOp::Fit, self.revision, error),
        };
        self.record(entry);
        status
    }

    fn bump(&mut self) {
        self.revision += 1;
        self.metadata.touch();
    }

    fn record(&mut self, entry: LogEntry) {
        self.log.push(entry);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────────

    /// Serialize the session to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Deserialize a session from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the schema version is newer
    /// than supported.
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(json)?;
        if session.metadata.schema_version > SCHEMA_VERSION {
            bail!(
                "session schema version {} is newer than supported version {}",
                session.metadata.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(session)
    }
}
