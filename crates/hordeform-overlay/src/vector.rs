//! Adaptive on-screen length of displacement vectors.
//!
//! A displacement `(dx, dy)` is drawn from the projected survey point to the
//! projection of `(x + dx·k, y + dy·k)`. The world-space multiplier `k`
//! combines a base scale, an optional weight relative to the largest visible
//! vector, and pixel-length clamps.

use hordeform_core::{Real, RenderSettings};

/// Magnitudes below this are treated as "no vector".
pub const MIN_VECTOR_MAGNITUDE: Real = 1e-9;

/// Largest visible magnitude below which relative weighting is disabled.
const MIN_MAX_VISIBLE: Real = 1e-9;

/// Projection scale below which pixel clamps are skipped.
const MIN_CLAMP_SCALE: Real = 1e-9;

/// Computes the world-space arrow multiplier `k`.
#[derive(Debug, Clone, Copy)]
pub struct VectorScaler;

impl VectorScaler {
    /// True if `magnitude` is large enough to draw an arrow.
    #[inline]
    pub fn is_drawable(magnitude: Real) -> bool {
        magnitude >= MIN_VECTOR_MAGNITUDE
    }

    /// Weight in `[0, 1]` for `magnitude` relative to `max_visible`.
    ///
    /// Returns 1 when weighting is off, when nothing visible has a magnitude,
    /// or for a zero magnitude.
    pub fn relative_weight(magnitude: Real, max_visible: Real, settings: &RenderSettings) -> Real {
        if !settings.use_relative_weight || max_visible <= MIN_MAX_VISIBLE || magnitude == 0.0 {
            return 1.0;
        }
        let exponent = settings.weight_exponent.max(0.0);
        (magnitude / max_visible).max(0.0).powf(exponent)
    }

    /// Pixel length of a vector drawn with multiplier `k` at projection `scale`.
    #[inline]
    pub fn pixel_length(magnitude: Real, k: Real, scale: Real) -> Real {
        magnitude * k * scale
    }

    /// Apply the min/max pixel clamps to `k`.
    ///
    /// Both clamps test the unclamped pixel length. The max clamp is checked
    /// second and wins; it is ignored when `0 < max < min`.
    pub fn clamp_multiplier(k: Real, magnitude: Real, scale: Real, settings: &RenderSettings) -> Real {
        if scale <= MIN_CLAMP_SCALE || !Self::is_drawable(magnitude) {
            return k;
        }
        let min_px = settings.min_arrow_px.max(0.0);
        let max_px = settings.max_arrow_px.max(0.0);
        let raw = Self::pixel_length(magnitude, k, scale);

        let mut k = k;
        if min_px > 0.0 && raw < min_px {
            k = min_px / (magnitude * scale);
        }
        if max_px > 0.0 && (max_px >= min_px || min_px <= 0.0) && raw > max_px {
            k = max_px / (magnitude * scale);
        }
        k
    }

    /// Effective multiplier for one vector.
    ///
    /// `max_visible` is the largest magnitude among the rows currently
    /// shown; `scale` is the current projection scale (pixels per world
    /// unit). Negative settings are read as 0.
    pub fn effective_multiplier(
        magnitude: Real,
        max_visible: Real,
        scale: Real,
        settings: &RenderSettings,
    ) -> Real {
        let settings = settings.clamped();
        let weight = Self::relative_weight(magnitude, max_visible, &settings);
        let k = settings.vector_scale_base * weight;
        Self::clamp_multiplier(k, magnitude, scale, &settings)
    }
}

/// See [`VectorScaler::effective_multiplier`].
pub fn effective_multiplier(
    magnitude: Real,
    max_visible: Real,
    scale: Real,
    settings: &RenderSettings,
) -> Real {
    VectorScaler::effective_multiplier(magnitude, max_visible, scale, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RenderSettings {
        RenderSettings {
            vector_scale_base: 100.0,
            use_relative_weight: false,
            weight_exponent: 1.0,
            min_arrow_px: 0.0,
            max_arrow_px: 0.0,
            arrow_head_size_px: 12.0,
        }
    }

    #[test]
    fn unweighted_is_base() {
        assert_eq!(effective_multiplier(0.3, 1.0, 2.0, &settings()), 100.0);
    }

    #[test]
    fn relative_weight_exponent_one_is_linear() {
        let s = RenderSettings {
            use_relative_weight: true,
            ..settings()
        };
        assert!((VectorScaler::relative_weight(0.5, 2.0, &s) - 0.25).abs() < 1e-12);
        assert_eq!(VectorScaler::relative_weight(0.0, 2.0, &s), 1.0);
        assert_eq!(VectorScaler::relative_weight(0.5, 0.0, &s), 1.0);
    }

    #[test]
    fn negative_exponent_reads_as_zero() {
        let s = RenderSettings {
            use_relative_weight: true,
            weight_exponent: -3.0,
            ..settings()
        };
        assert_eq!(effective_multiplier(0.1, 1.0, 1.0, &s), 100.0);
    }

    #[test]
    fn min_clamp_lifts_short_vectors() {
        let s = RenderSettings {
            min_arrow_px: 20.0,
            ..settings()
        };
        // raw: 0.01 * 100 * 2 = 2 px
        let k = effective_multiplier(0.01, 1.0, 2.0, &s);
        assert!((VectorScaler::pixel_length(0.01, k, 2.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn max_clamp_caps_long_vectors() {
        let s = RenderSettings {
            max_arrow_px: 50.0,
            ..settings()
        };
        // raw: 1 * 100 * 2 = 200 px
        let k = effective_multiplier(1.0, 1.0, 2.0, &s);
        assert!((VectorScaler::pixel_length(1.0, k, 2.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn max_below_min_is_ignored() {
        let s = RenderSettings {
            min_arrow_px: 40.0,
            max_arrow_px: 10.0,
            ..settings()
        };
        // raw 200 px: neither clamp applies.
        assert_eq!(effective_multiplier(1.0, 1.0, 2.0, &s), 100.0);
        // raw 2 px: only the min clamp applies.
        let k = effective_multiplier(0.01, 1.0, 2.0, &s);
        assert!((VectorScaler::pixel_length(0.01, k, 2.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn clamps_skipped_for_degenerate_scale() {
        let s = RenderSettings {
            min_arrow_px: 20.0,
            max_arrow_px: 50.0,
            ..settings()
        };
        assert_eq!(effective_multiplier(1.0, 1.0, 0.0, &s), 100.0);
    }

    #[test]
    fn negative_settings_are_clamped_on_read() {
        let s = RenderSettings {
            vector_scale_base: -5.0,
            ..settings()
        };
        assert_eq!(effective_multiplier(1.0, 1.0, 1.0, &s), 0.0);
    }

    #[test]
    fn drawable_threshold() {
        assert!(!VectorScaler::is_drawable(0.0));
        assert!(!VectorScaler::is_drawable(5e-10));
        assert!(VectorScaler::is_drawable(1e-9));
    }
}
