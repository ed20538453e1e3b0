use nalgebra::{Point2, Vector2};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Pt2 = Point2<Real>;

/// Point with both coordinates set to NaN.
///
/// Used as an explicit "not drawable" sentinel for rows without world
/// coordinates; renderers must skip it rather than draw at the origin.
pub fn nan_point() -> Pt2 {
    Pt2::new(Real::NAN, Real::NAN)
}

/// True if both coordinates are finite.
pub fn is_finite_point(p: &Pt2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Z component of `(b - o) × (c - o)`.
///
/// Positive for a counter-clockwise turn `o → b → c`, zero for collinear points.
pub fn cross(o: &Pt2, b: &Pt2, c: &Pt2) -> Real {
    (b.x - o.x) * (c.y - o.y) - (b.y - o.y) * (c.x - o.x)
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(deg: Real) -> Real {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Serde helper storing NaN coordinates as `null`.
///
/// JSON has no NaN literal; unset world coordinates round-trip as `null`.
pub mod nan_as_null {
    use super::Real;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Real, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Real, D::Error> {
        Ok(Option::<Real>::deserialize(deserializer)?.unwrap_or(Real::NAN))
    }
}

/// Serde helper storing a point with NaN coordinates as `[null, null]`.
///
/// Keeps the `[x, y]` layout nalgebra uses for finite points.
pub mod nan_point_as_null {
    use super::{Pt2, Real};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(point: &Pt2, serializer: S) -> Result<S::Ok, S::Error> {
        let coord = |v: Real| (!v.is_nan()).then_some(v);
        [coord(point.x), coord(point.y)].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pt2, D::Error> {
        let [x, y] = <[Option<Real>; 2]>::deserialize(deserializer)?;
        Ok(Pt2::new(x.unwrap_or(Real::NAN), y.unwrap_or(Real::NAN)))
    }
}
