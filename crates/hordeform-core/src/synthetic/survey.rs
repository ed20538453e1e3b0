//! Synthetic survey layouts: world grids, anchors and displacement rows.

use crate::{Anchor, CycleId, MeasurementPoint, Pt2, Real, TransformState, Vec2};

use super::noise::GaussianPixelNoise;

/// Generate a grid of `nx * ny` world points with the given spacing.
///
/// Points are ordered row-major (Y major): `(x = 0..nx-1, y = 0..ny-1)`.
pub fn grid_points(nx: usize, ny: usize, spacing: Real) -> Vec<Pt2> {
    let mut points = Vec::with_capacity(nx.saturating_mul(ny));
    for j in 0..ny {
        for i in 0..nx {
            points.push(Pt2::new(i as Real * spacing, j as Real * spacing));
        }
    }
    points
}

/// Project `world` through `truth` and perturb the image side with `noise`.
///
/// The i-th anchor uses noise index `i`.
pub fn anchors_from_transform(
    truth: &TransformState,
    world: &[Pt2],
    noise: &GaussianPixelNoise,
) -> Vec<Anchor> {
    world
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let p = truth.project(w);
            let uv = noise.apply(i, Vec2::new(p.x, p.y));
            Anchor::new(uv.x, uv.y, w.x, w.y)
        })
        .collect()
}

/// Rows for one cycle: each world point displaced by `displacement(i)`.
///
/// Points are numbered from 1 in input order.
pub fn cycle_rows<F>(cycle_id: CycleId, world: &[Pt2], mut displacement: F) -> Vec<MeasurementPoint>
where
    F: FnMut(usize) -> Vec2,
{
    world
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let d = displacement(i);
            MeasurementPoint::new(Some(i as i64 + 1), cycle_id)
                .with_world(w.x, w.y)
                .with_displacement(d.x, d.y)
        })
        .collect()
}
