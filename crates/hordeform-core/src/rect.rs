use serde::{Deserialize, Serialize};

use crate::{Pt2, Real};

/// Axis-aligned rectangle in screen (image) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub min_x: Real,
    pub min_y: Real,
    pub max_x: Real,
    pub max_y: Real,
}

impl ScreenRect {
    /// Rectangle spanned by two opposite corners in any order (a drag gesture).
    pub fn from_corners(a: Pt2, b: Pt2) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> Real {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> Real {
        self.max_y - self.min_y
    }

    /// Inclusive containment; NaN points are never contained.
    pub fn contains(&self, u: Real, v: Real) -> bool {
        u >= self.min_x && u <= self.max_x && v >= self.min_y && v <= self.max_y
    }
}
