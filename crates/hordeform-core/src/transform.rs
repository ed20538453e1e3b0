//! World → image similarity transform.
//!
//! The transform is stored in its user-facing form (scale, rotation in
//! degrees, offsets). Fitting works on the linear coefficients
//! `a = s·cos θ`, `b = s·sin θ`; both forms project through the one
//! forward model, [`similarity_forward`].

use serde::{Deserialize, Serialize};

use crate::{Pt2, Real, wrap_degrees};

/// Forward similarity model shared by the fitter and every projection consumer.
///
/// `u = a·x − b·y + tx`, `v = b·x + a·y + ty`.
#[inline]
pub fn similarity_forward(a: Real, b: Real, tx: Real, ty: Real, x: Real, y: Real) -> (Real, Real) {
    (a * x - b * y + tx, b * x + a * y + ty)
}

/// Current world → image mapping.
///
/// Mutated only by a successful fit or by explicit manual operations
/// ([`rotate_by`](Self::rotate_by), [`reset`](Self::reset)).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformState {
    /// Uniform scale (pixels per world unit).
    pub scale: Real,
    /// Rotation in degrees; any real value, wrapped only for display.
    pub rotation_deg: Real,
    /// Image-space translation along u.
    pub offset_x: Real,
    /// Image-space translation along v.
    pub offset_y: Real,
}

impl Default for TransformState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformState {
    /// Scale 1, no rotation, no offset.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        rotation_deg: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    pub fn new(scale: Real, rotation_deg: Real, offset_x: Real, offset_y: Real) -> Self {
        Self {
            scale,
            rotation_deg,
            offset_x,
            offset_y,
        }
    }

    /// Build from linear similarity coefficients `(a, b, tx, ty)`.
    pub fn from_coefficients(a: Real, b: Real, tx: Real, ty: Real) -> Self {
        Self {
            scale: (a * a + b * b).sqrt(),
            rotation_deg: b.atan2(a).to_degrees(),
            offset_x: tx,
            offset_y: ty,
        }
    }

    /// Linear coefficients `(a, b)` of the rotation/scale part.
    #[inline]
    pub fn coefficients(&self) -> (Real, Real) {
        let rad = self.rotation_deg.to_radians();
        (self.scale * rad.cos(), self.scale * rad.sin())
    }

    /// Project world `(x, y)` to image `(u, v)`.
    ///
    /// Pure; NaN in gives NaN out.
    #[inline]
    pub fn to_screen(&self, x: Real, y: Real) -> (Real, Real) {
        let (a, b) = self.coefficients();
        similarity_forward(a, b, self.offset_x, self.offset_y, x, y)
    }

    /// Point form of [`to_screen`](Self::to_screen).
    #[inline]
    pub fn project(&self, world: &Pt2) -> Pt2 {
        let (u, v) = self.to_screen(world.x, world.y);
        Pt2::new(u, v)
    }

    /// Algebraic inverse: image `(u, v)` back to world `(x, y)`.
    ///
    /// Returns NaN coordinates when the scale is zero.
    pub fn to_world(&self, u: Real, v: Real) -> (Real, Real) {
        let (a, b) = self.coefficients();
        let det = a * a + b * b;
        if det == 0.0 {
            return (Real::NAN, Real::NAN);
        }
        let du = u - self.offset_x;
        let dv = v - self.offset_y;
        ((a * du + b * dv) / det, (a * dv - b * du) / det)
    }

    /// Point form of [`to_world`](Self::to_world).
    pub fn unproject(&self, image: &Pt2) -> Pt2 {
        let (x, y) = self.to_world(image.x, image.y);
        Pt2::new(x, y)
    }

    /// Rotate by `degrees` (e.g. ±90 quick rotations). Scale and offsets are kept.
    pub fn rotate_by(&mut self, degrees: Real) {
        self.rotation_deg += degrees;
    }

    /// Reset to [`TransformState::IDENTITY`].
    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    /// Rotation wrapped into `[0, 360)` for display.
    pub fn display_rotation_deg(&self) -> Real {
        wrap_degrees(self.rotation_deg)
    }
}

impl std::fmt::Display for TransformState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scale={:.4} rot={:.2}° offset=({:.2}, {:.2})",
            self.scale,
            self.display_rotation_deg(),
            self.offset_x,
            self.offset_y
        )
    }
}
