//! Calibration session framework.
//!
//! A [`CalibrationSession`] owns the live transform and the anchors of a
//! calibration build. Operations mutate the session in place and record a
//! [`LogEntry`] in its audit trail.
//!
//! ```
//! use hordeform_pipeline::session::CalibrationSession;
//!
//! let mut session = CalibrationSession::new();
//! session.enter_build_mode();
//! session.add_anchor(100.0, 100.0, 0.0, 0.0);
//! session.add_anchor(200.0, 100.0, 10.0, 0.0);
//! assert!(session.accept());
//! assert!((session.transform().scale - 10.0).abs() < 1e-9);
//! ```

pub mod calibsession;
pub mod types;

pub use calibsession::{
    BuildTool, CalibrationSession, DUPLICATE_WORLD_TOLERANCE, FitStatus, SCHEMA_VERSION,
    SESSION_KIND, SessionState,
};
pub use types::{LogEntry, SessionMetadata, SessionOp, unix_now};
