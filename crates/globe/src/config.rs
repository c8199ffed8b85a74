use std::env;
use std::time::Duration;

use runtime::event_bus::DEFAULT_EVENT_CAPACITY;

/// Timing and retry knobs for globe bootstrap and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct MediatorConfig {
    /// Total bootstrap tries for transient faults, first one included.
    pub bootstrap_attempts: u32,
    /// Backoff before retry `n` is `bootstrap_backoff * n`.
    pub bootstrap_backoff: Duration,
    pub mount_poll_attempts: u32,
    pub mount_poll_interval: Duration,
    pub frame_interval: Duration,
    pub camera_animation: Duration,
    pub event_capacity: usize,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            bootstrap_attempts: 3,
            bootstrap_backoff: Duration::from_millis(500),
            mount_poll_attempts: 50,
            mount_poll_interval: Duration::from_millis(100),
            frame_interval: Duration::from_millis(16),
            camera_animation: Duration::from_millis(1000),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl MediatorConfig {
    /// Reads `GLOBE_*` variables, falling back to defaults for anything
    /// missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bootstrap_attempts: env_var_u32(
                &lookup,
                "GLOBE_BOOTSTRAP_ATTEMPTS",
                defaults.bootstrap_attempts,
            )
            .max(1),
            bootstrap_backoff: env_var_millis(
                &lookup,
                "GLOBE_BOOTSTRAP_BACKOFF_MS",
                defaults.bootstrap_backoff,
            ),
            mount_poll_attempts: env_var_u32(
                &lookup,
                "GLOBE_MOUNT_POLL_ATTEMPTS",
                defaults.mount_poll_attempts,
            )
            .max(1),
            mount_poll_interval: env_var_millis(
                &lookup,
                "GLOBE_MOUNT_POLL_INTERVAL_MS",
                defaults.mount_poll_interval,
            ),
            frame_interval: env_var_millis(
                &lookup,
                "GLOBE_FRAME_INTERVAL_MS",
                defaults.frame_interval,
            )
            .max(Duration::from_millis(1)),
            camera_animation: env_var_millis(
                &lookup,
                "GLOBE_CAMERA_ANIMATION_MS",
                defaults.camera_animation,
            ),
            event_capacity: env_var_usize(
                &lookup,
                "GLOBE_EVENT_CAPACITY",
                defaults.event_capacity,
            )
            .max(1),
        }
    }
}

fn env_var_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_usize(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
