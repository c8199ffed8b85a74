//! In-process rendering backend.
//!
//! `HeadlessBackend` renders nothing but tracks every resource it hands out,
//! which makes it the backend for the host binary and for tests. It can be
//! scripted to misbehave: report itself unsupported, fail the first N loads,
//! mount containers late or never, reject a texture, or fail draws.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use scene::point_cloud::PointBuffer;
use scene::prefabs::GlobeScene;
use tracing::debug;

use crate::backend::{
    BackendError, BackendInfo, BoxFuture, DrawFrame, MountTarget, RenderBackend, RenderSurface,
};

pub const HEADLESS_VERSION: &str = "headless-1";

/// Counters shared between the backend, its surfaces and observers.
#[derive(Debug, Default)]
pub struct HeadlessStats {
    load_attempts: AtomicU32,
    surfaces_created: AtomicUsize,
    live_surfaces: AtomicUsize,
    scene_uploads: AtomicUsize,
    point_uploads: AtomicUsize,
    draws: AtomicU64,
    last_draw: Mutex<Option<DrawFrame>>,
    last_points: Mutex<Option<PointBuffer>>,
}

impl HeadlessStats {
    pub fn load_attempts(&self) -> u32 {
        self.load_attempts.load(Ordering::SeqCst)
    }

    pub fn surfaces_created(&self) -> usize {
        self.surfaces_created.load(Ordering::SeqCst)
    }

    /// Surfaces created and not yet released.
    pub fn live_surfaces(&self) -> usize {
        self.live_surfaces.load(Ordering::SeqCst)
    }

    pub fn scene_uploads(&self) -> usize {
        self.scene_uploads.load(Ordering::SeqCst)
    }

    pub fn point_uploads(&self) -> usize {
        self.point_uploads.load(Ordering::SeqCst)
    }

    pub fn draws(&self) -> u64 {
        self.draws.load(Ordering::SeqCst)
    }

    pub fn last_draw(&self) -> Option<DrawFrame> {
        *self.last_draw.lock()
    }

    pub fn last_points(&self) -> Option<PointBuffer> {
        self.last_points.lock().clone()
    }
}

#[derive(Debug, Clone)]
struct Script {
    supported: bool,
    transient_load_failures: u32,
    load_delay: Duration,
    /// `None` never mounts; `Some(n)` mounts on the poll after `n` misses.
    mount_after_polls: Option<u32>,
    faulty_texture: Option<String>,
    failing_scene_uploads: bool,
    failing_draws: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            supported: true,
            transient_load_failures: 0,
            load_delay: Duration::ZERO,
            mount_after_polls: Some(0),
            faulty_texture: None,
            failing_scene_uploads: false,
            failing_draws: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    script: Script,
    remaining_load_failures: AtomicU32,
    mount_polls: Mutex<HashMap<String, u32>>,
    stats: Arc<HeadlessStats>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unsupported(mut self) -> Self {
        self.script.supported = false;
        self
    }

    /// The first `n` loads fail with a transient error.
    pub fn failing_loads(mut self, n: u32) -> Self {
        self.script.transient_load_failures = n;
        self.remaining_load_failures = AtomicU32::new(n);
        self
    }

    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.script.load_delay = delay;
        self
    }

    /// Each container is found only after `polls` unsuccessful lookups.
    pub fn mount_after(mut self, polls: u32) -> Self {
        self.script.mount_after_polls = Some(polls);
        self
    }

    pub fn never_mount(mut self) -> Self {
        self.script.mount_after_polls = None;
        self
    }

    /// Scene uploads referencing `url` fail with a resource error.
    pub fn faulty_texture(mut self, url: impl Into<String>) -> Self {
        self.script.faulty_texture = Some(url.into());
        self
    }

    /// Every scene upload fails with a resource error.
    pub fn failing_scene_uploads(mut self) -> Self {
        self.script.failing_scene_uploads = true;
        self
    }

    pub fn failing_draws(mut self) -> Self {
        self.script.failing_draws = true;
        self
    }

    pub fn stats(&self) -> Arc<HeadlessStats> {
        self.stats.clone()
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn is_supported(&self) -> bool {
        self.script.supported
    }

    fn load(&self) -> BoxFuture<'_, Result<BackendInfo, BackendError>> {
        Box::pin(async move {
            let attempt = self.stats.load_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.script.load_delay.is_zero() {
                tokio::time::sleep(self.script.load_delay).await;
            }

            let failing = self
                .remaining_load_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                debug!(attempt, "headless load failing as scripted");
                return Err(BackendError::transient(format!(
                    "renderer script failed to load (attempt {attempt})"
                )));
            }

            Ok(BackendInfo {
                name: self.name().to_string(),
                version: HEADLESS_VERSION.to_string(),
            })
        })
    }

    fn find_mount(&self, container_id: &str) -> Option<MountTarget> {
        let threshold = self.script.mount_after_polls?;
        let mut polls = self.mount_polls.lock();
        let seen = polls.entry(container_id.to_string()).or_insert(0);
        if *seen < threshold {
            *seen += 1;
            return None;
        }
        Some(MountTarget {
            container_id: container_id.to_string(),
        })
    }

    fn create_surface(
        &self,
        mount: &MountTarget,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn RenderSurface>, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::resource(format!(
                "cannot create {width}x{height} surface for '{}'",
                mount.container_id
            )));
        }
        self.stats.surfaces_created.fetch_add(1, Ordering::SeqCst);
        self.stats.live_surfaces.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HeadlessSurface {
            stats: self.stats.clone(),
            faulty_texture: self.script.faulty_texture.clone(),
            failing_scene_uploads: self.script.failing_scene_uploads,
            failing_draws: self.script.failing_draws,
            width,
            height,
            released: false,
        }))
    }
}

#[derive(Debug)]
struct HeadlessSurface {
    stats: Arc<HeadlessStats>,
    faulty_texture: Option<String>,
    failing_scene_uploads: bool,
    failing_draws: bool,
    width: u32,
    height: u32,
    released: bool,
}

impl RenderSurface for HeadlessSurface {
    fn upload_scene(&mut self, scene: &GlobeScene) -> Result<(), BackendError> {
        if self.failing_scene_uploads {
            return Err(BackendError::resource("scene upload failed"));
        }
        if let Some(bad) = &self.faulty_texture {
            if scene.graph.textures().iter().any(|t| &t.url == bad) {
                return Err(BackendError::resource(format!("failed to load texture {bad}")));
            }
        }
        self.stats.scene_uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn upload_points(&mut self, points: &PointBuffer) -> Result<(), BackendError> {
        self.stats.point_uploads.fetch_add(1, Ordering::SeqCst);
        *self.stats.last_points.lock() = Some(points.clone());
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn draw(&mut self, frame: &DrawFrame) -> Result<(), BackendError> {
        if self.failing_draws {
            return Err(BackendError::resource(format!(
                "draw failed on {}x{} surface",
                self.width, self.height
            )));
        }
        self.stats.draws.fetch_add(1, Ordering::SeqCst);
        *self.stats.last_draw.lock() = Some(*frame);
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stats.live_surfaces.fetch_sub(1, Ordering::SeqCst);
    }
}
