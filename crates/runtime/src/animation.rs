use foundation::math::Vec3;

/// Cubic ease-in-out: `4t³` for `t < 0.5`, else `(t-1)(2t-2)² + 1`.
///
/// `t` is clamped to `[0, 1]` first.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = 2.0 * t - 2.0;
        (t - 1.0) * u * u + 1.0
    }
}

/// Time-driven interpolation between two points.
///
/// The tween advances by explicit deltas (one step per rendered frame) and
/// never reads a clock itself.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vec3Tween {
    from: Vec3,
    to: Vec3,
    duration_s: f64,
    elapsed_s: f64,
}

impl Vec3Tween {
    pub fn new(from: Vec3, to: Vec3, duration_s: f64) -> Self {
        Self {
            from,
            to,
            duration_s: duration_s.max(0.0),
            elapsed_s: 0.0,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.to
    }

    /// Normalized progress in `[0, 1]`. A zero-length tween is complete.
    pub fn progress(&self) -> f64 {
        if self.duration_s <= 0.0 {
            return 1.0;
        }
        (self.elapsed_s / self.duration_s).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Advances by `dt_s` and returns the eased position.
    pub fn step(&mut self, dt_s: f64) -> Vec3 {
        if dt_s.is_finite() && dt_s > 0.0 {
            self.elapsed_s += dt_s;
        }
        self.current()
    }

    pub fn current(&self) -> Vec3 {
        if self.is_finished() {
            return self.to;
        }
        self.from.lerp(self.to, ease_in_out_cubic(self.progress()))
    }
}
