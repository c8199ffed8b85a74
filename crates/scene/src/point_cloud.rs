//! Participant point cloud.
//!
//! The store is the single source of truth for what the renderer draws. Each
//! record keeps the participant and its unit-sphere position; the position is
//! recomputed from latitude/longitude on every write so the two never drift.
//!
//! Every successful mutation bumps [`PointCloud::generation`]. Renderers
//! compare it against the generation they last uploaded and rebuild the draw
//! buffer on the next frame when it changed.

use foundation::math::{Vec3, lat_lng_to_position, validate_coordinates};
use serde::{Deserialize, Serialize};

/// Points render slightly above the earth sphere to avoid z-fighting.
pub const POINT_RENDER_RADIUS: f64 = 1.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPoint {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ParticipantPoint {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn has_valid_coordinates(&self) -> bool {
        validate_coordinates(self.latitude, self.longitude)
    }

    /// Unit-sphere position derived from the coordinates.
    pub fn unit_position(&self) -> Vec3 {
        lat_lng_to_position(self.latitude, self.longitude, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PointRecord {
    point: ParticipantPoint,
    position: Vec3,
}

impl PointRecord {
    fn new(point: ParticipantPoint) -> Self {
        let position = point.unit_position();
        Self { point, position }
    }
}

/// Flat `xyz` draw buffer built from a point cloud.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointBuffer {
    pub generation: u64,
    pub positions: Vec<f32>,
}

impl PointBuffer {
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    records: Vec<PointRecord>,
    generation: u64,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&ParticipantPoint> {
        self.index_of(id).map(|idx| &self.records[idx].point)
    }

    /// Replaces all content with `points`, in order.
    ///
    /// Ids are not checked for uniqueness; bulk loaders own that. The old
    /// backing storage is released rather than reused.
    pub fn replace_all(&mut self, points: Vec<ParticipantPoint>) {
        self.records = points.into_iter().map(PointRecord::new).collect();
        self.bump();
    }

    /// Adds one point at the end. Returns `false` without mutating if a
    /// point with the same id already exists.
    pub fn add_one(&mut self, point: ParticipantPoint) -> bool {
        if self.contains(&point.id) {
            return false;
        }
        self.records.push(PointRecord::new(point));
        self.bump();
        true
    }

    /// Moves one point in place. Returns `false` if `id` is unknown.
    pub fn update_position(&mut self, id: &str, latitude: f64, longitude: f64) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let record = &mut self.records[idx];
        record.point.latitude = latitude;
        record.point.longitude = longitude;
        record.position = record.point.unit_position();
        self.bump();
        true
    }

    /// Removes one point, compacting in place and keeping draw order.
    pub fn remove_one(&mut self, id: &str) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        self.records.remove(idx);
        self.bump();
        true
    }

    pub fn clear(&mut self) {
        self.replace_all(Vec::new());
    }

    pub fn snapshot(&self) -> Vec<ParticipantPoint> {
        self.records.iter().map(|r| r.point.clone()).collect()
    }

    /// Unit-sphere positions in draw order.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.records.iter().map(|r| r.position)
    }

    pub fn point_at(&self, index: usize) -> Option<&ParticipantPoint> {
        self.records.get(index).map(|r| &r.point)
    }

    /// Builds the draw buffer with positions scaled to `radius`.
    pub fn buffer(&self, radius: f64) -> PointBuffer {
        let mut positions = Vec::with_capacity(self.records.len() * 3);
        for r in &self.records {
            let p = r.position.scale(radius);
            positions.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
        }
        PointBuffer {
            generation: self.generation,
            positions,
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.point.id == id)
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
