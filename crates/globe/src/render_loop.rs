use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::instance::{FrameOutcome, GlobeInstance};

/// Spawns the frame ticker for one instance.
///
/// The task only holds a weak reference, so it ends on its own once the
/// instance is dropped or leaves `Ready`. Frames that fall behind are
/// skipped rather than replayed in a burst.
pub fn spawn(instance: Weak<Mutex<GlobeInstance>>, frame_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(run(instance, frame_interval))
}

async fn run(instance: Weak<Mutex<GlobeInstance>>, frame_interval: Duration) {
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = ticker.tick().await;

    loop {
        let now = ticker.tick().await;
        let dt_s = now.duration_since(last).as_secs_f64();
        last = now;

        let Some(handle) = instance.upgrade() else {
            debug!("render loop stopped: instance dropped");
            return;
        };
        let outcome = handle.lock().render_frame(dt_s);
        if outcome == FrameOutcome::Stop {
            debug!("render loop stopped: instance not ready");
            return;
        }
    }
}
