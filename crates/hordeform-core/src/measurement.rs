//! Measurement rows and the read-only row provider interface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Pt2, Real, Vec2};

/// Monitored object (e.g. a pit or a building section).
pub type ObjectId = i32;
/// Measurement campaign / epoch.
pub type CycleId = i32;

/// Rows of one object grouped by cycle, in ascending cycle order.
pub type CycleRows = BTreeMap<CycleId, Vec<MeasurementPoint>>;
/// All objects known to a provider.
pub type ObjectMap = BTreeMap<ObjectId, CycleRows>;

/// One row of a displacement diagram: a surveyed point and its displacement
/// in a given cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurementPoint {
    /// Point number, when the source table carries one.
    #[serde(default)]
    pub id: Option<i64>,
    pub cycle_id: CycleId,
    #[serde(default)]
    pub world_x: Option<Real>,
    #[serde(default)]
    pub world_y: Option<Real>,
    #[serde(default)]
    pub dx: Option<Real>,
    #[serde(default)]
    pub dy: Option<Real>,
}

impl MeasurementPoint {
    pub fn new(id: Option<i64>, cycle_id: CycleId) -> Self {
        Self {
            id,
            cycle_id,
            ..Default::default()
        }
    }

    pub fn with_world(mut self, x: Real, y: Real) -> Self {
        self.world_x = Some(x);
        self.world_y = Some(y);
        self
    }

    pub fn with_displacement(mut self, dx: Real, dy: Real) -> Self {
        self.dx = Some(dx);
        self.dy = Some(dy);
        self
    }

    /// World position when both coordinates are present.
    pub fn world(&self) -> Option<Pt2> {
        Some(Pt2::new(self.world_x?, self.world_y?))
    }

    /// Displacement vector when both components are present.
    pub fn displacement(&self) -> Option<Vec2> {
        Some(Vec2::new(self.dx?, self.dy?))
    }

    /// `sqrt(dx² + dy²)` when both components are present.
    pub fn magnitude(&self) -> Option<Real> {
        self.displacement().map(|d| d.norm())
    }
}

impl std::fmt::Display for MeasurementPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "#{id}")?,
            None => write!(f, "#")?,
        }
        match (self.world_x, self.world_y) {
            (Some(x), Some(y)) => write!(f, " ({x:.3}; {y:.3})"),
            _ => write!(f, " (—)"),
        }
    }
}

/// Read-only query interface of the measurement data source.
///
/// Hosts implement this over whatever holds the imported tables; the core
/// never reaches into provider internals.
pub trait RowProvider {
    /// All objects with their rows grouped by cycle.
    fn objects(&self) -> &ObjectMap;

    /// Rows of one object, if known.
    fn cycles(&self, object: ObjectId) -> Option<&CycleRows> {
        self.objects().get(&object)
    }

    /// Object ids in ascending order.
    fn object_ids(&self) -> Vec<ObjectId> {
        self.objects().keys().copied().collect()
    }
}

/// In-memory [`RowProvider`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryRows {
    objects: ObjectMap,
}

impl InMemoryRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to `object`, grouped by the row's cycle.
    pub fn insert(&mut self, object: ObjectId, point: MeasurementPoint) {
        self.objects
            .entry(object)
            .or_default()
            .entry(point.cycle_id)
            .or_default()
            .push(point);
    }

    /// Build from `(object, row)` pairs.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (ObjectId, MeasurementPoint)>,
    {
        let mut out = Self::new();
        for (object, point) in rows {
            out.insert(object, point);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Total row count across objects and cycles.
    pub fn row_count(&self) -> usize {
        self.objects
            .values()
            .flat_map(|cycles| cycles.values())
            .map(Vec::len)
            .sum()
    }
}

impl RowProvider for InMemoryRows {
    fn objects(&self) -> &ObjectMap {
        &self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_requires_both_components() {
        let p = MeasurementPoint::new(Some(1), 1).with_displacement(3.0, 4.0);
        assert_eq!(p.magnitude(), Some(5.0));

        let mut q = p;
        q.dy = None;
        assert_eq!(q.magnitude(), None);
        assert!(q.displacement().is_none());
    }

    #[test]
    fn world_requires_both_coordinates() {
        let mut p = MeasurementPoint::new(None, 2).with_world(1.0, 2.0);
        assert_eq!(p.world(), Some(Pt2::new(1.0, 2.0)));
        p.world_x = None;
        assert!(p.world().is_none());
    }

    #[test]
    fn display_format() {
        let p = MeasurementPoint::new(Some(12), 1).with_world(1.0, 2.5);
        assert_eq!(p.to_string(), "#12 (1.000; 2.500)");
    }

    #[test]
    fn in_memory_groups_by_object_and_cycle() {
        let rows = InMemoryRows::from_rows([
            (1, MeasurementPoint::new(Some(1), 2)),
            (1, MeasurementPoint::new(Some(2), 1)),
            (1, MeasurementPoint::new(Some(3), 2)),
            (7, MeasurementPoint::new(Some(1), 1)),
        ]);
        assert_eq!(rows.object_ids(), vec![1, 7]);
        let cycles = rows.cycles(1).unwrap();
        assert_eq!(cycles.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(cycles[&2].len(), 2);
        assert_eq!(rows.row_count(), 4);
        assert!(rows.cycles(99).is_none());
    }

    #[test]
    fn json_uses_integer_keys() {
        let rows = InMemoryRows::from_rows([(
            3,
            MeasurementPoint::new(Some(5), 1)
                .with_world(10.0, 20.0)
                .with_displacement(0.5, -0.5),
        )]);
        let json = serde_json::to_string(&rows).unwrap();
        let back: InMemoryRows = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rows);
    }
}
