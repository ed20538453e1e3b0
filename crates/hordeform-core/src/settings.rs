//! Vector display settings.
//!
//! The host owns the mutable settings; the core only ever sees an immutable
//! [`RenderSettings`] value wrapped in a versioned [`SettingsSnapshot`].

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::Real;

/// Settings that govern displacement arrow scaling.
///
/// All numeric fields are clamped to `>= 0` when read through
/// [`clamped`](Self::clamped).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Base world-space multiplier applied to every displacement.
    pub vector_scale_base: Real,
    /// Weight vectors by their magnitude relative to the largest visible one.
    pub use_relative_weight: bool,
    /// Exponent of the relative weight curve (0..2 typical).
    pub weight_exponent: Real,
    /// Minimum arrow length in pixels; 0 disables the clamp.
    pub min_arrow_px: Real,
    /// Maximum arrow length in pixels; 0 disables the clamp.
    pub max_arrow_px: Real,
    /// Arrowhead size in pixels.
    pub arrow_head_size_px: Real,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            vector_scale_base: 1.0,
            use_relative_weight: true,
            weight_exponent: 1.0,
            min_arrow_px: 0.0,
            max_arrow_px: 0.0,
            arrow_head_size_px: 12.0,
        }
    }
}

impl RenderSettings {
    /// Copy with every numeric field clamped to `>= 0`.
    pub fn clamped(&self) -> Self {
        Self {
            vector_scale_base: self.vector_scale_base.max(0.0),
            use_relative_weight: self.use_relative_weight,
            weight_exponent: self.weight_exponent.max(0.0),
            min_arrow_px: self.min_arrow_px.max(0.0),
            max_arrow_px: self.max_arrow_px.max(0.0),
            arrow_head_size_px: self.arrow_head_size_px.max(0.0),
        }
    }

    /// Reject non-finite values.
    ///
    /// Negative values are accepted here and clamped on read.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first non-finite field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("vector_scale_base", self.vector_scale_base),
            ("weight_exponent", self.weight_exponent),
            ("min_arrow_px", self.min_arrow_px),
            ("max_arrow_px", self.max_arrow_px),
            ("arrow_head_size_px", self.arrow_head_size_px),
        ];
        for (name, value) in fields {
            ensure!(value.is_finite(), "{name} must be finite, got {value}");
        }
        Ok(())
    }
}

/// Immutable settings value plus a monotonically increasing version.
///
/// Caches compare versions to know when to rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub version: u64,
    pub settings: RenderSettings,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl SettingsSnapshot {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            version: 1,
            settings,
        }
    }

    /// Replace the settings and bump the version.
    ///
    /// # Errors
    ///
    /// Returns an error (and keeps the old snapshot) if validation fails.
    pub fn replace(&mut self, settings: RenderSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.version += 1;
        Ok(())
    }

    /// Update the settings with a closure, validating the result.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails after the update.
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut RenderSettings),
    {
        let mut next = self.settings;
        f(&mut next);
        self.replace(next)
    }
}
