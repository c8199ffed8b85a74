//! Rendering backend seam.
//!
//! A backend is shared by every globe in the process and hands out one
//! [`RenderSurface`] per mounted container. Surfaces own GPU-side state and
//! are released exactly once by the instance that created them.

use std::future::Future;
use std::pin::Pin;

use foundation::math::Vec3;
use scene::point_cloud::PointBuffer;
use scene::prefabs::GlobeScene;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// The environment cannot render at all.
    Unsupported,
    /// Loading or probing failed but may work on retry.
    Transient,
    /// A surface, buffer or texture could not be created.
    Resource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unsupported, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transient, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Resource, message)
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    pub name: String,
    pub version: String,
}

/// Host element a surface is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTarget {
    pub container_id: String,
}

/// Per-frame view handed to [`RenderSurface::draw`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawFrame {
    pub frame_index: u64,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    pub earth_rotation: f64,
    pub cloud_rotation: f64,
    pub point_count: usize,
}

pub trait RenderBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap synchronous capability probe.
    fn is_supported(&self) -> bool;

    /// Loads the rendering library. Called once per bootstrap attempt.
    fn load(&self) -> BoxFuture<'_, Result<BackendInfo, BackendError>>;

    /// Looks up the host element for `container_id`. `None` while the host
    /// has not attached it yet.
    fn find_mount(&self, container_id: &str) -> Option<MountTarget>;

    fn create_surface(
        &self,
        mount: &MountTarget,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn RenderSurface>, BackendError>;
}

pub trait RenderSurface: Send {
    fn upload_scene(&mut self, scene: &GlobeScene) -> Result<(), BackendError>;

    /// Replaces the whole participant point buffer.
    fn upload_points(&mut self, points: &PointBuffer) -> Result<(), BackendError>;

    fn resize(&mut self, width: u32, height: u32);

    fn draw(&mut self, frame: &DrawFrame) -> Result<(), BackendError>;

    /// Frees every GPU-side resource. The surface is dropped right after.
    fn release(&mut self);
}
