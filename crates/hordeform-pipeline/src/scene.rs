//! One-shot calibration of a stored scene.
//!
//! A [`Scene`] bundles measurement rows, the anchors a user placed and an
//! optional starting transform. [`run_scene`] replays the anchors through a
//! build-mode session, accepts or cancels the result and reports the
//! projected geometry of the visible cycles.

use anyhow::{Context, Result, ensure};
use hordeform_core::{
    Anchor, CycleId, InMemoryRows, ObjectId, Real, RenderSettings, TransformState,
};
use hordeform_overlay::{CycleOverlay, DisplayMode, ProjectedRow};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::session::{CalibrationSession, FitStatus, LogEntry};
use crate::view::DeformationView;

/// Stored calibration input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    /// Measurement rows keyed by object, then cycle.
    pub rows: InMemoryRows,
    /// Correspondences to replay, in placement order.
    pub anchors: Vec<Anchor>,
    /// Transform before calibration; identity if absent.
    pub transform: Option<TransformState>,
    /// Render settings stored with the scene.
    pub settings: Option<RenderSettings>,
}

/// How to present the scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    /// Object to show; first object if absent.
    pub object: Option<ObjectId>,
    pub mode: DisplayMode,
    /// Cycles to select; all cycles if absent.
    pub cycles: Option<Vec<CycleId>>,
    /// Overrides the scene's own settings.
    pub settings: Option<RenderSettings>,
}

/// Result of [`run_scene`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeformationReport {
    pub object: Option<ObjectId>,
    pub transform: TransformState,
    pub fit: FitStatus,
    pub accepted: bool,
    pub rms_info: String,
    pub anchors: Vec<Anchor>,
    pub cycles: String,
    pub max_visible_magnitude: Real,
    pub rows: Vec<ProjectedRow>,
    pub overlays: Vec<CycleOverlay>,
    pub log: Vec<LogEntry>,
}

/// Calibrate `scene` and project its visible rows.
///
/// Anchors without world coordinates are placed but do not take part in the
/// fit. With fewer than two usable anchors the build is cancelled and the
/// starting transform is kept.
///
/// # Errors
///
/// Returns an error if the requested object does not exist or the settings
/// are invalid.
pub fn run_scene(scene: &Scene, options: &SceneOptions) -> Result<DeformationReport> {
    let start = scene.transform.unwrap_or_default();
    let mut view =
        DeformationView::with_session(scene.rows.clone(), CalibrationSession::with_transform(start));

    if let Some(object) = options.object {
        ensure!(
            view.objects().contains(&object),
            "object {object} not found (available: {:?})",
            view.objects()
        );
        view.select_object(object);
    }
    view.set_display_mode(options.mode);
    if let Some(cycles) = &options.cycles {
        view.select_cycles(cycles);
    }
    if let Some(settings) = options.settings.or(scene.settings) {
        view.replace_settings(settings)
            .context("invalid render settings")?;
    }

    let session = view.session_mut();
    session.enter_build_mode();
    for anchor in &scene.anchors {
        if anchor.has_world() {
            session.add_anchor(anchor.image_u, anchor.image_v, anchor.world_x, anchor.world_y);
        } else {
            session.add_anchor_image_only(anchor.image_u, anchor.image_v);
        }
    }
    let fit = session.last_fit();
    let rms_info = session.rms_info();
    let anchors = session.anchors().as_slice().to_vec();
    let accepted = session.accept();
    if accepted {
        info!("calibration accepted: {} ({rms_info})", session.transform());
    } else {
        warn!("calibration not accepted ({rms_info}); keeping starting transform");
        session.cancel();
    }

    Ok(DeformationReport {
        object: view.selected_object(),
        transform: view.transform(),
        fit,
        accepted,
        rms_info,
        anchors,
        cycles: view.cycles_summary(),
        max_visible_magnitude: view.max_visible_magnitude(),
        rows: view.projected_rows(),
        overlays: view.overlays().to_vec(),
        log: view.session().log.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hordeform_core::{
        MeasurementPoint,
        synthetic::{noise::GaussianPixelNoise, survey},
    };

    fn scene() -> Scene {
        let truth = TransformState::new(10.0, 0.0, 100.0, 100.0);
        let grid = survey::grid_points(3, 3, 1.0);
        let mut rows = InMemoryRows::new();
        for p in survey::cycle_rows(1, &grid, |_| hordeform_core::Vec2::new(0.01, 0.0)) {
            rows.insert(7, p);
        }
        for p in survey::cycle_rows(2, &grid, |i| hordeform_core::Vec2::new(0.0, 0.01 * i as Real)) {
            rows.insert(7, p);
        }
        let world = [grid[0], grid[2], grid[6]];
        Scene {
            rows,
            anchors: survey::anchors_from_transform(&truth, &world, &GaussianPixelNoise::default()),
            transform: None,
            settings: None,
        }
    }

    #[test]
    fn scene_calibrates_and_projects() {
        let report = run_scene(&scene(), &SceneOptions::default()).unwrap();
        assert!(report.accepted);
        assert!(report.fit.is_fitted());
        assert!((report.transform.scale - 10.0).abs() < 1e-9);
        assert_eq!(report.object, Some(7));
        assert_eq!(report.rows.len(), 18);
        assert_eq!(report.overlays.len(), 2);
        assert!(report.overlays.iter().all(CycleOverlay::is_filled));
        assert_eq!(report.cycles, "Cycles: all (2)");
    }

    #[test]
    fn too_few_anchors_keeps_start_transform() {
        let mut s = scene();
        s.anchors.truncate(1);
        s.transform = Some(TransformState::new(2.0, 0.0, 0.0, 0.0));
        let report = run_scene(&s, &SceneOptions::default()).unwrap();
        assert!(!report.accepted);
        assert_eq!(report.transform, TransformState::new(2.0, 0.0, 0.0, 0.0));
        assert_eq!(report.rms_info, "Select at least 2 anchors");
    }

    #[test]
    fn options_select_cycles_and_mode() {
        let options = SceneOptions {
            cycles: Some(vec![2]),
            ..SceneOptions::default()
        };
        let report = run_scene(&scene(), &options).unwrap();
        assert_eq!(report.cycles, "Cycles: 2");
        assert!(report.rows.iter().all(|r| r.point.cycle_id == 2));

        let options = SceneOptions {
            mode: DisplayMode::LastCycle,
            cycles: Some(vec![1]),
            ..SceneOptions::default()
        };
        let report = run_scene(&scene(), &options).unwrap();
        assert!(report.rows.iter().all(|r| r.point.cycle_id == 2));
        assert_eq!(report.overlays.len(), 2);
    }

    #[test]
    fn unknown_object_is_an_error() {
        let options = SceneOptions {
            object: Some(3),
            ..SceneOptions::default()
        };
        let err = run_scene(&scene(), &options).unwrap_err();
        assert!(err.to_string().contains("object 3 not found"));
    }

    #[test]
    fn image_only_anchor_is_carried_through() {
        let mut s = scene();
        s.anchors.push(Anchor::image_only(1.0, 1.0));
        s.rows.insert(7, MeasurementPoint::new(Some(99), 1));
        let report = run_scene(&s, &SceneOptions::default()).unwrap();
        assert!(report.accepted);
        assert_eq!(report.anchors.len(), 4);
        assert!(!report.anchors[3].has_world());
        assert!(report.rows.iter().any(|r| !r.is_drawable()));
    }

    #[test]
    fn collinear_anchors_are_not_accepted() {
        let mut s = scene();
        let truth = TransformState::new(10.0, 0.0, 100.0, 100.0);
        let line = survey::grid_points(3, 1, 1.0);
        s.anchors = survey::anchors_from_transform(&truth, &line, &GaussianPixelNoise::default());
        let report = run_scene(&s, &SceneOptions::default()).unwrap();
        assert!(!report.accepted);
        assert!(!report.fit.is_fitted());
        assert_eq!(report.transform, TransformState::IDENTITY);
    }

    #[test]
    fn report_with_undrawable_rows_reads_back() {
        let mut s = scene();
        s.rows.insert(7, MeasurementPoint::new(Some(99), 1));
        let report = run_scene(&s, &SceneOptions::default()).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: DeformationReport = serde_json::from_str(&json).unwrap();

        assert_eq!(back.rows.len(), report.rows.len());
        let hidden = back.rows.iter().find(|r| r.point.id == Some(99)).unwrap();
        assert!(!hidden.is_drawable());
        assert!(hidden.arrow_end.x.is_nan() && hidden.label.y.is_nan());
        for (a, b) in report.rows.iter().zip(&back.rows).filter(|(a, _)| a.is_drawable()) {
            assert_eq!(a.point, b.point);
            assert!((a.screen - b.screen).norm() < 1e-9);
            assert!((a.arrow_end - b.arrow_end).norm() < 1e-9);
            assert_eq!(a.arrow_head.len(), b.arrow_head.len());
        }
        assert!((back.transform.scale - report.transform.scale).abs() < 1e-9);
    }
}
