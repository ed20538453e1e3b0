//! Calibration workflow for displacement diagrams.
//!
//! - [`session`]: build-mode [`CalibrationSession`] with snapshot/restore,
//!   anchor editing, refitting and an operation log.
//! - [`view`]: [`DeformationView`], which keeps projected rows and cycle
//!   overlays in sync with the session, the cycle selection and the render
//!   settings through lazily rebuilt cache layers.
//! - [`scene`]: one-shot calibration of a stored [`Scene`], used by the CLI.

pub mod scene;
pub mod session;
pub mod view;

pub use scene::{DeformationReport, Scene, SceneOptions, run_scene};
pub use session::{BuildTool, CalibrationSession, FitStatus, SessionState};
pub use view::DeformationView;
