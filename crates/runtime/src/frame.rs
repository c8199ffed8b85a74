/// Upper bound on a single frame step (seconds).
///
/// Hosts throttle frame callbacks for hidden pages; without a cap the first
/// frame after resuming would spin the globe and finish animations at once.
pub const MAX_FRAME_DT_S: f64 = 0.25;

/// Frame metadata for one render-loop iteration.
///
/// Unlike a fixed-step simulation, the delta comes from the host's frame
/// callback, so it varies per frame. It is sanitized on entry.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Frame {
    /// 0-based frame index; the frame before the first rendered one is 0.
    pub index: u64,
    /// Delta time since the previous frame (seconds).
    pub dt_s: f64,
    /// Accumulated time across all frames (seconds).
    pub elapsed_s: f64,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next frame after `dt_s` seconds.
    ///
    /// Negative or non-finite deltas count as zero; large ones are capped at
    /// [`MAX_FRAME_DT_S`].
    pub fn advance(self, dt_s: f64) -> Self {
        let dt_s = sanitize_dt(dt_s);
        Self {
            index: self.index + 1,
            dt_s,
            elapsed_s: self.elapsed_s + dt_s,
        }
    }
}

fn sanitize_dt(dt_s: f64) -> f64 {
    if !dt_s.is_finite() || dt_s <= 0.0 {
        0.0
    } else {
        dt_s.min(MAX_FRAME_DT_S)
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, MAX_FRAME_DT_S};

    #[test]
    fn advance_accumulates_time() {
        let f = Frame::new().advance(0.125).advance(0.25);
        assert_eq!(f.index, 2);
        assert_eq!(f.dt_s, 0.25);
        assert_eq!(f.elapsed_s, 0.375);

        let capped = f.advance(0.5);
        assert_eq!(capped.dt_s, MAX_FRAME_DT_S);
        assert_eq!(capped.elapsed_s, 0.625);
    }

    #[test]
    fn advance_sanitizes_delta() {
        let f = Frame::new().advance(f64::NAN);
        assert_eq!(f.index, 1);
        assert_eq!(f.dt_s, 0.0);

        let f = f.advance(-1.0);
        assert_eq!(f.dt_s, 0.0);

        let f = f.advance(10.0);
        assert_eq!(f.dt_s, MAX_FRAME_DT_S);
    }
}
