use foundation::math::{Vec2, Vec3, position_to_lat_lng};
use runtime::animation::Vec3Tween;

use crate::picking::Ray;

/// Distance from the globe center a fresh camera starts at.
pub const DEFAULT_CAMERA_DISTANCE: f64 = 2.5;
pub const DEFAULT_FOV_Y_DEG: f64 = 75.0;

/// Perspective camera orbiting the unit globe.
///
/// The camera always looks at `target` (the origin for globe views). Moves
/// are either immediate ([`Camera::set_position`]) or animated
/// ([`Camera::animate_to`]) and advanced by [`Camera::step`] once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_deg: f64,
    pub aspect: f64,
    animation: Option<Vec3Tween>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, DEFAULT_CAMERA_DISTANCE),
            target: Vec3::ZERO,
            fov_y_deg: DEFAULT_FOV_Y_DEG,
            aspect: 1.0,
            animation: None,
        }
    }
}

impl Camera {
    pub fn new(aspect: f64) -> Self {
        let mut camera = Self::default();
        camera.set_aspect(aspect);
        camera
    }

    /// Ignores non-finite or non-positive ratios.
    pub fn set_aspect(&mut self, aspect: f64) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Jumps to `position`, cancelling any animation.
    pub fn set_position(&mut self, position: Vec3) {
        self.animation = None;
        self.position = position;
    }

    /// Starts an animation from the current position to `to`.
    ///
    /// An in-flight animation is replaced; the new one starts wherever the
    /// camera is now, so there is no jump.
    pub fn animate_to(&mut self, to: Vec3, duration_s: f64) {
        self.animation = Some(Vec3Tween::new(self.position, to, duration_s));
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn animation_target(&self) -> Option<Vec3> {
        self.animation.map(|a| a.target())
    }

    /// Advances the animation by `dt_s`. Returns `true` while it moved.
    pub fn step(&mut self, dt_s: f64) -> bool {
        let Some(tween) = self.animation.as_mut() else {
            return false;
        };
        self.position = tween.step(dt_s);
        if tween.is_finished() {
            self.animation = None;
        }
        true
    }

    /// Distance to the origin; reported to hosts as the zoom level.
    pub fn distance(&self) -> f64 {
        self.position.length()
    }

    /// Geographic point directly below the camera.
    pub fn center_lat_lng(&self) -> (f64, f64) {
        position_to_lat_lng(self.position)
    }

    /// World-space ray through normalized device coordinates (`[-1, 1]`,
    /// +y up). `None` when the camera sits on its target.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let forward = (self.target - self.position).normalize()?;
        // Looking straight down the pole leaves `forward x UP` degenerate.
        let right = forward
            .cross(Vec3::UP)
            .normalize()
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let up = right.cross(forward);

        let half_h = (self.fov_y_deg.to_radians() * 0.5).tan();
        let half_w = half_h * self.aspect;
        let dir = forward + right.scale(ndc.x * half_w) + up.scale(ndc.y * half_h);
        Some(Ray::new(self.position, dir.normalize()?))
    }
}
