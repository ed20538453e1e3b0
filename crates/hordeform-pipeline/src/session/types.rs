//! Session bookkeeping: metadata and the transition log.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Identity and timestamps of a serialized session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub kind: String,
    pub schema_version: u32,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    /// Seconds since the Unix epoch; advanced on every revision.
    pub modified_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SessionMetadata {
    pub fn new(kind: impl Into<String>, schema_version: u32) -> Self {
        let now = unix_now();
        Self {
            kind: kind.into(),
            schema_version,
            created_at: now,
            modified_at: now,
            description: None,
        }
    }

    /// Attach a free-form description (site, object, operator).
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn touch(&mut self) {
        self.modified_at = unix_now();
    }
}

/// Session transition recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOp {
    EnterBuild,
    Fit,
    Accept,
    Cancel,
    Rotate,
    ResetTransform,
}

impl SessionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnterBuild => "enter_build",
            Self::Fit => "fit",
            Self::Accept => "accept",
            Self::Cancel => "cancel",
            Self::Rotate => "rotate",
            Self::ResetTransform => "reset_transform",
        }
    }
}

impl std::fmt::Display for SessionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the session audit trail.
///
/// Records what happened and at which revision; it is not an undo stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: u64,
    pub op: SessionOp,
    /// Session revision after the transition.
    pub revision: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LogEntry {
    pub fn ok(op: SessionOp, revision: u64) -> Self {
        Self {
            timestamp: unix_now(),
            op,
            revision,
            success: true,
            notes: None,
        }
    }

    pub fn failed(op: SessionOp, revision: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            notes: Some(error.into()),
            ..Self::ok(op, revision)
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Seconds since the Unix epoch; 0 if the clock reads earlier.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_moves_forward() {
        let mut meta = SessionMetadata::new("calibration", 1).describe("pit 3");
        let created = meta.created_at;
        meta.touch();
        assert!(meta.modified_at >= created);
        assert_eq!(meta.description.as_deref(), Some("pit 3"));
    }

    #[test]
    fn entries_carry_op_and_revision() {
        let ok = LogEntry::ok(SessionOp::Fit, 4).with_notes("rms=0.10px");
        assert!(ok.success);
        assert_eq!(ok.revision, 4);
        assert_eq!(ok.notes.as_deref(), Some("rms=0.10px"));

        let err = LogEntry::failed(SessionOp::Fit, 5, "singular");
        assert!(!err.success);
        assert_eq!(err.op.to_string(), "fit");
        assert!(unix_now() >= err.timestamp);
    }

    #[test]
    fn op_serializes_snake_case() {
        let json = serde_json::to_string(&SessionOp::ResetTransform).unwrap();
        assert_eq!(json, "\"reset_transform\"");
        let entry: LogEntry =
            serde_json::from_str(r#"{"timestamp": 0, "op": "cancel", "revision": 2, "success": true}"#)
                .unwrap();
        assert_eq!(entry.op, SessionOp::Cancel);
        assert!(entry.notes.is_none());
    }
}
