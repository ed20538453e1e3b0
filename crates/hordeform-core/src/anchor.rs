//! Control-point correspondences (world ↔ image) and their fit status.

use serde::{Deserialize, Serialize};

use crate::{Pt2, Real, nan_as_null};

/// One user-declared correspondence between a world point and an image pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Pixel u where the user clicked or selected.
    pub image_u: Real,
    /// Pixel v where the user clicked or selected.
    pub image_v: Real,
    /// World x; NaN while unset.
    #[serde(with = "nan_as_null", default = "unset")]
    pub world_x: Real,
    /// World y; NaN while unset.
    #[serde(with = "nan_as_null", default = "unset")]
    pub world_y: Real,
    /// Predicted pixel u from the last successful fit.
    #[serde(default)]
    pub predicted_u: Option<Real>,
    /// Predicted pixel v from the last successful fit.
    #[serde(default)]
    pub predicted_v: Option<Real>,
    /// Distance between predicted and recorded image position; 0 until fit.
    #[serde(default)]
    pub residual: Real,
}

fn unset() -> Real {
    Real::NAN
}

impl Anchor {
    /// Correspondence with both image and world coordinates.
    pub fn new(image_u: Real, image_v: Real, world_x: Real, world_y: Real) -> Self {
        Self {
            image_u,
            image_v,
            world_x,
            world_y,
            predicted_u: None,
            predicted_v: None,
            residual: 0.0,
        }
    }

    /// Image pick whose world coordinates will be assigned later.
    pub fn image_only(image_u: Real, image_v: Real) -> Self {
        Self::new(image_u, image_v, Real::NAN, Real::NAN)
    }

    /// True when both world coordinates are set; only such anchors are fitted.
    pub fn has_world(&self) -> bool {
        !self.world_x.is_nan() && !self.world_y.is_nan()
    }

    pub fn image(&self) -> Pt2 {
        Pt2::new(self.image_u, self.image_v)
    }

    pub fn world(&self) -> Pt2 {
        Pt2::new(self.world_x, self.world_y)
    }

    /// Assign or replace the world coordinates.
    pub fn set_world(&mut self, world_x: Real, world_y: Real) {
        self.world_x = world_x;
        self.world_y = world_y;
        self.clear_prediction();
    }

    /// Record the fitted prediction and the resulting residual.
    pub fn set_prediction(&mut self, predicted_u: Real, predicted_v: Real) {
        let du = predicted_u - self.image_u;
        let dv = predicted_v - self.image_v;
        self.predicted_u = Some(predicted_u);
        self.predicted_v = Some(predicted_v);
        self.residual = (du * du + dv * dv).sqrt();
    }

    pub fn clear_prediction(&mut self) {
        self.predicted_u = None;
        self.predicted_v = None;
        self.residual = 0.0;
    }

    /// True if the world position matches `(x, y)` within `tol` on both axes.
    pub fn same_world(&self, x: Real, y: Real, tol: Real) -> bool {
        (self.world_x - x).abs() < tol && (self.world_y - y).abs() < tol
    }
}

/// Ordered collection of anchors placed during a calibration build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorSet {
    anchors: Vec<Anchor>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, anchor: Anchor) {
        self.anchors.push(anchor);
    }

    /// Remove the anchor at `index`, returning it with its prediction cleared.
    pub fn remove(&mut self, index: usize) -> Option<Anchor> {
        if index >= self.anchors.len() {
            return None;
        }
        let mut anchor = self.anchors.remove(index);
        anchor.clear_prediction();
        Some(anchor)
    }

    pub fn clear(&mut self) {
        self.anchors.clear();
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Anchor> {
        self.anchors.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Anchor> {
        self.anchors.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.anchors.iter()
    }

    pub fn as_slice(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn as_mut_slice(&mut self) -> &mut [Anchor] {
        &mut self.anchors
    }

    /// Anchors that participate in fitting.
    pub fn with_world(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter().filter(|a| a.has_world())
    }

    /// Number of anchors with world coordinates.
    pub fn world_count(&self) -> usize {
        self.with_world().count()
    }

    /// True if an anchor with world coordinates within `tol` already exists.
    pub fn contains_world(&self, x: Real, y: Real, tol: Real) -> bool {
        self.anchors.iter().any(|a| a.same_world(x, y, tol))
    }

    pub fn clear_predictions(&mut self) {
        for anchor in &mut self.anchors {
            anchor.clear_prediction();
        }
    }
}

impl<'a> IntoIterator for &'a AnchorSet {
    type Item = &'a Anchor;
    type IntoIter = std::slice::Iter<'a, Anchor>;

    fn into_iter(self) -> Self::IntoIter {
        self.anchors.iter()
    }
}

impl FromIterator<Anchor> for AnchorSet {
    fn from_iter<I: IntoIterator<Item = Anchor>>(iter: I) -> Self {
        Self {
            anchors: iter.into_iter().collect(),
        }
    }
}
