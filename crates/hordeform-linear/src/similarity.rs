//! Least-squares similarity transform from world/image anchors.
//!
//! Model: `u = a·x − b·y + tx`, `v = b·x + a·y + ty` with `a = s·cos θ`,
//! `b = s·sin θ`. Parametrising by `(a, b, tx, ty)` keeps the problem linear
//! despite the embedded rotation. Every anchor contributes the design rows
//! `r1 = [x, −y, 1, 0]` (for `u`) and `r2 = [y, x, 0, 1]` (for `v`) to the
//! normal equations `AᵗA p = Aᵗy`, which are solved by Gauss–Jordan
//! elimination.
//!
//! Two anchors determine the transform exactly; more anchors give the
//! least-squares solution. Coincident world points make the normal matrix
//! singular; three or more anchors that all lie on one world line are
//! rejected as degenerate as well. Both cases report
//! [`FitError::SingularSystem`].

use hordeform_core::{Anchor, Pt2, Real, TransformState, cross, similarity_forward};
use log::debug;
use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::solve::solve_gauss_jordan;

/// Minimum number of anchors with world coordinates for a fit.
pub const MIN_ANCHORS: usize = 2;

/// Relative off-line distance below which world points count as collinear.
const COLLINEAR_TOLERANCE: Real = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FitError {
    #[error("need at least 2 anchors with world coordinates, got {0}")]
    InsufficientAnchors(usize),
    #[error("world/image point counts differ ({world} vs {image})")]
    LengthMismatch { world: usize, image: usize },
    #[error("anchors are collinear or coincident; add a non-collinear anchor")]
    SingularSystem,
}

/// Linear similarity coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityParams {
    pub a: Real,
    pub b: Real,
    pub tx: Real,
    pub ty: Real,
}

impl SimilarityParams {
    /// Project world `(x, y)` with the forward model.
    #[inline]
    pub fn apply(&self, x: Real, y: Real) -> (Real, Real) {
        similarity_forward(self.a, self.b, self.tx, self.ty, x, y)
    }

    /// Recover scale, rotation (degrees) and offsets.
    pub fn to_transform(&self) -> TransformState {
        TransformState::from_coefficients(self.a, self.b, self.tx, self.ty)
    }
}

/// Outcome of a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: SimilarityParams,
    pub transform: TransformState,
    /// Residual (pixels) per participating anchor, in anchor order.
    pub residuals: Vec<Real>,
    /// `sqrt(mean(residual²))`.
    pub rms: Real,
    pub max_residual: Real,
    pub anchors_used: usize,
}

/// Estimator for the 4-parameter similarity transform.
///
/// Thin namespace around the normal-equation solve, mirroring the other
/// closed-form solvers in the workspace.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityFitter;

/// Fit the transform to all anchors with world coordinates.
///
/// See [`SimilarityFitter::fit`].
pub fn fit_similarity(anchors: &mut [Anchor]) -> Result<FitResult, FitError> {
    SimilarityFitter::fit(anchors)
}

impl SimilarityFitter {
    /// Accumulate `AᵗA` and `Aᵗy` over all correspondences.
    pub fn normal_equations(world: &[Pt2], image: &[Pt2]) -> (Matrix4<Real>, Vector4<Real>) {
        let mut ata = Matrix4::<Real>::zeros();
        let mut aty = Vector4::<Real>::zeros();
        for (w, i) in world.iter().zip(image) {
            let r1 = Vector4::new(w.x, -w.y, 1.0, 0.0);
            let r2 = Vector4::new(w.y, w.x, 0.0, 1.0);
            ata += r1 * r1.transpose() + r2 * r2.transpose();
            aty += r1 * i.x + r2 * i.y;
        }
        (ata, aty)
    }

    /// Estimate `(a, b, tx, ty)` from paired world and image points.
    ///
    /// # Errors
    ///
    /// - [`FitError::LengthMismatch`] if the slices differ in length,
    /// - [`FitError::InsufficientAnchors`] for fewer than [`MIN_ANCHORS`] pairs,
    /// - [`FitError::SingularSystem`] for collinear/coincident world points.
    pub fn estimate(world: &[Pt2], image: &[Pt2]) -> Result<SimilarityParams, FitError> {
        if world.len() != image.len() {
            return Err(FitError::LengthMismatch {
                world: world.len(),
                image: image.len(),
            });
        }
        if world.len() < MIN_ANCHORS {
            return Err(FitError::InsufficientAnchors(world.len()));
        }

        if world.len() > MIN_ANCHORS && all_collinear(world) {
            return Err(FitError::SingularSystem);
        }

        let (ata, aty) = Self::normal_equations(world, image);
        let p = solve_gauss_jordan(&ata, &aty).ok_or(FitError::SingularSystem)?;

        Ok(SimilarityParams {
            a: p[0],
            b: p[1],
            tx: p[2],
            ty: p[3],
        })
    }

    /// Fit the transform to every anchor with world coordinates and record
    /// per-anchor predictions and residuals.
    ///
    /// Anchors without world coordinates are ignored and left untouched. On
    /// error no anchor is modified; clearing stale predictions and reverting
    /// the transform is up to the caller.
    ///
    /// # Errors
    ///
    /// See [`SimilarityFitter::estimate`].
    pub fn fit(anchors: &mut [Anchor]) -> Result<FitResult, FitError> {
        let (world, image): (Vec<Pt2>, Vec<Pt2>) = anchors
            .iter()
            .filter(|a| a.has_world())
            .map(|a| (a.world(), a.image()))
            .unzip();

        let params = match Self::estimate(&world, &image) {
            Ok(params) => params,
            Err(err) => {
                debug!("similarity fit failed over {} anchors: {err}", world.len());
                return Err(err);
            }
        };

        let mut residuals = Vec::with_capacity(world.len());
        for anchor in anchors.iter_mut().filter(|a| a.has_world()) {
            let (u, v) = params.apply(anchor.world_x, anchor.world_y);
            anchor.set_prediction(u, v);
            residuals.push(anchor.residual);
        }

        let sum_sq: Real = residuals.iter().map(|r| r * r).sum();
        let rms = (sum_sq / residuals.len() as Real).sqrt();
        let max_residual = residuals.iter().copied().fold(0.0, Real::max);
        let transform = params.to_transform();

        debug!(
            "similarity fit: {transform}, rms={rms:.4}px over {} anchors",
            residuals.len()
        );

        Ok(FitResult {
            params,
            transform,
            anchors_used: residuals.len(),
            residuals,
            rms,
            max_residual,
        })
    }
}

/// True if every point lies on the line through the first point and the
/// point farthest from it (coincident points included).
fn all_collinear(points: &[Pt2]) -> bool {
    let Some(p0) = points.first() else {
        return true;
    };
    let Some(p1) = points
        .iter()
        .max_by(|a, b| (*a - *p0).norm_squared().total_cmp(&(*b - *p0).norm_squared()))
    else {
        return true;
    };
    let span = (*p1 - *p0).norm();
    if span == 0.0 {
        return true;
    }
    let tol = COLLINEAR_TOLERANCE * span.max(1.0);
    points.iter().all(|p| (cross(p0, p1, p) / span).abs() < tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_anchors_pure_scale() {
        let world = [Pt2::new(0.0, 0.0), Pt2::new(10.0, 0.0)];
        let image = [Pt2::new(100.0, 100.0), Pt2::new(200.0, 100.0)];
        let p = SimilarityFitter::estimate(&world, &image).unwrap();
        assert!((p.a - 10.0).abs() < 1e-9);
        assert!(p.b.abs() < 1e-9);
        assert!((p.tx - 100.0).abs() < 1e-9);
        assert!((p.ty - 100.0).abs() < 1e-9);
    }

    #[test]
    fn single_anchor_is_insufficient() {
        let err = SimilarityFitter::estimate(&[Pt2::new(1.0, 1.0)], &[Pt2::new(2.0, 2.0)])
            .unwrap_err();
        assert_eq!(err, FitError::InsufficientAnchors(1));
    }

    #[test]
    fn mismatched_lengths() {
        let err = SimilarityFitter::estimate(&[Pt2::origin(); 3], &[Pt2::origin(); 2]).unwrap_err();
        assert_eq!(err, FitError::LengthMismatch { world: 3, image: 2 });
    }

    #[test]
    fn coincident_world_points_are_singular() {
        let world = [Pt2::new(3.0, 3.0), Pt2::new(3.0, 3.0)];
        let image = [Pt2::new(0.0, 0.0), Pt2::new(5.0, 5.0)];
        assert_eq!(
            SimilarityFitter::estimate(&world, &image).unwrap_err(),
            FitError::SingularSystem
        );
    }

    #[test]
    fn collinear_detection() {
        let line = [Pt2::new(0.0, 0.0), Pt2::new(1.0, 0.0), Pt2::new(2.0, 0.0)];
        assert!(all_collinear(&line));
        let diagonal = [Pt2::new(1.0, 1.0), Pt2::new(3.0, 3.0), Pt2::new(-5.0, -5.0)];
        assert!(all_collinear(&diagonal));
        let triangle = [Pt2::new(0.0, 0.0), Pt2::new(1.0, 0.0), Pt2::new(0.0, 1e-3)];
        assert!(!all_collinear(&triangle));
    }

    #[test]
    fn normal_matrix_is_symmetric() {
        let world = [Pt2::new(1.0, 2.0), Pt2::new(-3.0, 0.5), Pt2::new(4.0, 4.0)];
        let image = [Pt2::new(0.0, 1.0), Pt2::new(2.0, 3.0), Pt2::new(5.0, -1.0)];
        let (ata, _) = SimilarityFitter::normal_equations(&world, &image);
        assert_eq!(ata, ata.transpose());
        // Translation block counts the anchors.
        assert_eq!(ata[(2, 2)], 3.0);
        assert_eq!(ata[(3, 3)], 3.0);
        assert_eq!(ata[(2, 3)], 0.0);
    }

    #[test]
    fn fit_skips_anchors_without_world() {
        let mut anchors = vec![
            Anchor::new(100.0, 100.0, 0.0, 0.0),
            Anchor::image_only(50.0, 50.0),
            Anchor::new(200.0, 100.0, 10.0, 0.0),
        ];
        let result = fit_similarity(&mut anchors).unwrap();
        assert_eq!(result.anchors_used, 2);
        assert_eq!(result.residuals.len(), 2);
        assert!(anchors[1].predicted_u.is_none());
        assert!(anchors[0].predicted_u.is_some());
        assert!(result.rms < 1e-9);
    }

    #[test]
    fn failed_fit_leaves_anchors_untouched() {
        let mut anchors = vec![
            Anchor::new(0.0, 0.0, 0.0, 0.0),
            Anchor::new(1.0, 0.0, 1.0, 0.0),
            Anchor::new(2.0, 0.0, 2.0, 0.0),
        ];
        anchors[0].set_prediction(9.0, 9.0);
        let before = anchors.clone();
        assert_eq!(
            fit_similarity(&mut anchors).unwrap_err(),
            FitError::SingularSystem
        );
        assert_eq!(anchors, before);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            FitError::InsufficientAnchors(1).to_string(),
            "need at least 2 anchors with world coordinates, got 1"
        );
        assert!(FitError::SingularSystem.to_string().contains("non-collinear"));
    }
}
