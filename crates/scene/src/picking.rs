use foundation::math::Vec3;

use crate::point_cloud::PointCloud;

/// Default pick radius around each point, in world units.
pub const DEFAULT_PICK_THRESHOLD: f64 = 0.1;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir.scale(t)
    }

    /// Entry distance into a sphere of `radius` centered at the origin.
    pub fn sphere_entry(&self, radius: f64) -> Option<f64> {
        let b = self.origin.dot(self.dir);
        let c = self.origin.dot(self.origin) - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        if t >= 0.0 {
            Some(t)
        } else if c <= 0.0 {
            // Origin inside the sphere.
            Some(0.0)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub index: usize,
    pub id: String,
    pub distance: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointPick {
    /// Rotation of the group holding the points, around +Y.
    pub rotation_y: f64,
    /// Radius the points are drawn at.
    pub radius: f64,
    pub threshold: f64,
    /// Radius of the opaque globe that hides points behind it.
    pub occluder_radius: f64,
}

/// Picks the participant point closest along `ray`.
///
/// A point is hit when the ray passes within `threshold` of it in front of
/// the origin and the globe does not hide it. Equal distances resolve to the
/// lower draw index.
pub fn pick_point(cloud: &PointCloud, ray: Ray, opts: PointPick) -> Option<PickHit> {
    let dir = ray.dir.normalize()?;
    // Work in the points' local frame instead of rotating every point.
    let local = Ray::new(
        ray.origin.rotate_y(-opts.rotation_y),
        dir.rotate_y(-opts.rotation_y),
    );
    let occluded_after = local
        .sphere_entry(opts.occluder_radius)
        .map(|t| t + opts.threshold);

    let mut best: Option<(f64, usize)> = None;
    for (index, unit) in cloud.positions().enumerate() {
        let p = unit.scale(opts.radius);
        let t = (p - local.origin).dot(local.dir);
        if t < 0.0 {
            continue;
        }
        if (local.at(t) - p).length() > opts.threshold {
            continue;
        }
        if occluded_after.is_some_and(|limit| t > limit) {
            continue;
        }
        best = match best {
            Some((bt, bi)) if bt.total_cmp(&t).then(bi.cmp(&index)).is_le() => Some((bt, bi)),
            _ => Some((t, index)),
        };
    }

    let (distance, index) = best?;
    let point = cloud.point_at(index)?;
    Some(PickHit {
        index,
        id: point.id.clone(),
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PICK_THRESHOLD, PointPick, Ray, pick_point};
    use crate::point_cloud::{POINT_RENDER_RADIUS, ParticipantPoint, PointCloud};
    use foundation::math::Vec3;

    fn opts(rotation_y: f64) -> PointPick {
        PointPick {
            rotation_y,
            radius: POINT_RENDER_RADIUS,
            threshold: DEFAULT_PICK_THRESHOLD,
            occluder_radius: 1.0,
        }
    }

    fn cloud() -> PointCloud {
        let mut cloud = PointCloud::new();
        // (0, 0) sits on +X; (0, -90) sits on +Z, facing the default camera.
        cloud.add_one(ParticipantPoint::new("x", "East", 0.0, 0.0));
        cloud.add_one(ParticipantPoint::new("z", "Front", 0.0, -90.0));
        cloud
    }

    #[test]
    fn picks_point_facing_camera() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.5), Vec3::new(0.0, 0.0, -1.0));
        let hit = pick_point(&cloud(), ray, opts(0.0)).unwrap();
        assert_eq!(hit.id, "z");
        assert_eq!(hit.index, 1);
        assert!((hit.distance - (2.5 - POINT_RENDER_RADIUS)).abs() < 1e-9);
    }

    #[test]
    fn misses_empty_space() {
        let ray = Ray::new(Vec3::new(0.0, 3.0, 2.5), Vec3::new(0.0, 0.0, -1.0));
        assert!(pick_point(&cloud(), ray, opts(0.0)).is_none());
        assert!(pick_point(&PointCloud::new(), ray, opts(0.0)).is_none());
    }

    #[test]
    fn globe_hides_far_side() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.5), Vec3::new(0.0, 0.0, 1.0));
        let mut back = PointCloud::new();
        back.add_one(ParticipantPoint::new("z", "Front", 0.0, -90.0));
        assert!(pick_point(&back, ray, opts(0.0)).is_none());
    }

    #[test]
    fn follows_group_rotation() {
        // Rotating the group by +90° carries +X (0, 0) round to -Z.
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.5), Vec3::new(0.0, 0.0, 1.0));
        let hit = pick_point(&cloud(), ray, opts(std::f64::consts::FRAC_PI_2)).unwrap();
        assert_eq!(hit.id, "x");
    }
}
