//! Deterministic noise helpers for synthetic datasets.
//!
//! The functions here avoid RNG crates entirely and derive every sample from
//! a SplitMix64 stream keyed by `(seed, index)`. This keeps synthetic
//! datasets stable across versions and platforms.

use crate::{Real, Vec2};

/// Deterministic uniform pixel noise in `[-max_abs_px, +max_abs_px]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformPixelNoise {
    /// Base seed controlling the pseudo-random sequence.
    pub seed: u64,
    /// Maximum absolute per-axis noise (pixels).
    pub max_abs_px: Real,
}

impl UniformPixelNoise {
    /// Sample a deterministic 2D noise vector (pixels) for `index`.
    #[inline]
    pub fn sample(&self, index: usize) -> Vec2 {
        let max_abs = self.max_abs_px.abs();
        if max_abs == 0.0 {
            return Vec2::zeros();
        }
        let (u, v) = unit_pair(self.seed, index);
        // Map [0, 1) -> [-max_abs, +max_abs].
        Vec2::new((u - 0.5) * 2.0 * max_abs, (v - 0.5) * 2.0 * max_abs)
    }
}

/// Deterministic zero-mean Gaussian pixel noise with per-axis `sigma_px`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GaussianPixelNoise {
    /// Base seed controlling the pseudo-random sequence.
    pub seed: u64,
    /// Per-axis standard deviation (pixels).
    pub sigma_px: Real,
}

impl GaussianPixelNoise {
    /// Sample a deterministic 2D noise vector (pixels) for `index`.
    ///
    /// Uses the Box–Muller transform on two uniform draws.
    #[inline]
    pub fn sample(&self, index: usize) -> Vec2 {
        let sigma = self.sigma_px.abs();
        if sigma == 0.0 {
            return Vec2::zeros();
        }
        let (u1, u2) = unit_pair(self.seed, index);
        // Shift u1 into (0, 1] so ln() stays finite.
        let r = (-2.0 * (1.0 - u1).ln()).sqrt();
        let phi = std::f64::consts::TAU * u2;
        Vec2::new(sigma * r * phi.cos(), sigma * r * phi.sin())
    }

    /// Apply deterministic noise to a pixel observation.
    #[inline]
    pub fn apply(&self, index: usize, uv: Vec2) -> Vec2 {
        uv + self.sample(index)
    }
}

#[inline]
fn unit_pair(seed: u64, index: usize) -> (Real, Real) {
    let key = seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let u = u64_to_unit_f64(splitmix64(key));
    let v = u64_to_unit_f64(splitmix64(key ^ 0x94D0_49BB_1331_11EB));
    (u, v)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn u64_to_unit_f64(x: u64) -> Real {
    // Top 53 bits -> [0, 1).
    let mantissa = x >> 11;
    (mantissa as Real) * (1.0 / ((1u64 << 53) as Real))
}
