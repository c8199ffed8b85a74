//! Host-facing globe API.
//!
//! Every operation is addressed by container id and answers with a result
//! envelope instead of an error: nothing a host does through the mediator can
//! panic or leak an error past it. When the rendering backend is unavailable
//! the data operations still report success, since participant storage stays
//! authoritative and the globe is purely a view of it.

use std::sync::Arc;
use std::time::Instant;

use runtime::event_bus::Event;
use scene::graph::LightKind;
use scene::point_cloud::ParticipantPoint;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::RenderBackend;
use crate::bootstrap::initialize_with_retry;
use crate::config::MediatorConfig;
use crate::error::GlobeError;
use crate::events::GlobeEvent;
use crate::instance::GlobeInstance;
use crate::options::GlobeOptions;
use crate::registry::InstanceRegistry;
use crate::results::{GlobeInstanceState, InitResult, OpResult};

pub const DEFAULT_CENTER_ZOOM: f64 = 2.0;
pub const DEFAULT_ROTATION_SPEED: f64 = 0.5;

pub struct GlobeMediator {
    backend: Arc<dyn RenderBackend>,
    registry: InstanceRegistry,
    config: MediatorConfig,
}

impl GlobeMediator {
    pub fn new(backend: Arc<dyn RenderBackend>, config: MediatorConfig) -> Self {
        let registry = InstanceRegistry::new(config.camera_animation, config.event_capacity);
        Self {
            backend,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_supported()
    }

    /// Bootstraps the globe for `container_id`, retrying transient faults.
    ///
    /// An already initialized globe reports success with its existing id.
    pub async fn initialize(
        &self,
        container_id: &str,
        options: GlobeOptions,
        cancel: &CancellationToken,
    ) -> InitResult {
        if cancel.is_cancelled() {
            return InitResult::failed(GlobeError::Cancelled.to_string());
        }
        if !self.is_available() {
            let err = GlobeError::BackendUnavailable(format!(
                "{} is not supported here",
                self.backend.name()
            ));
            warn!(%container_id, error = %err, "cannot initialize globe");
            return InitResult::failed(err.to_string());
        }

        let handle = self.registry.get_or_create(container_id);
        let existing = {
            let instance = handle.lock();
            match (instance.is_ready(), instance.globe_id(), instance.backend_version()) {
                (true, Some(id), Some(version)) => Some((id.to_string(), version.to_string())),
                _ => None,
            }
        };
        if let Some((globe_id, version)) = existing {
            debug!(%container_id, %globe_id, "globe already initialized");
            return InitResult::ok(globe_id, version);
        }

        let started = Instant::now();
        match initialize_with_retry(&handle, self.backend.as_ref(), &options, &self.config, cancel)
            .await
        {
            Ok(done) => {
                info!(
                    %container_id,
                    globe_id = %done.globe_id,
                    attempts = done.attempts,
                    elapsed_ms = elapsed_ms(started),
                    "globe initialization succeeded"
                );
                InitResult::ok(done.globe_id, done.backend_version)
            }
            Err(err) => {
                warn!(%container_id, error = %err, "globe initialization failed");
                InitResult::failed(err.to_string())
            }
        }
    }

    /// Replaces every participant on the globe.
    pub async fn add_participants(
        &self,
        container_id: &str,
        points: Vec<ParticipantPoint>,
        cancel: &CancellationToken,
    ) -> OpResult {
        let count = points.len();
        self.command(container_id, cancel, "add_participants", count, |globe| {
            globe.add_participants(points)
        })
    }

    pub async fn add_participant(
        &self,
        container_id: &str,
        point: ParticipantPoint,
        cancel: &CancellationToken,
    ) -> OpResult {
        self.command(container_id, cancel, "add_participant", 1, |globe| {
            globe.add_participant(point).map(|()| 1)
        })
    }

    pub async fn remove_participant(
        &self,
        container_id: &str,
        participant_id: &str,
        cancel: &CancellationToken,
    ) -> OpResult {
        self.command(container_id, cancel, "remove_participant", 1, |globe| {
            globe.remove_participant(participant_id).map(|()| 1)
        })
    }

    pub async fn update_position(
        &self,
        container_id: &str,
        participant_id: &str,
        latitude: f64,
        longitude: f64,
        cancel: &CancellationToken,
    ) -> OpResult {
        self.command(container_id, cancel, "update_position", 1, |globe| {
            globe
                .update_position(participant_id, latitude, longitude)
                .map(|()| 1)
        })
    }

    /// Animates the camera over a point. `zoom` defaults to
    /// [`DEFAULT_CENTER_ZOOM`].
    pub async fn center_on(
        &self,
        container_id: &str,
        latitude: f64,
        longitude: f64,
        zoom: Option<f64>,
        cancel: &CancellationToken,
    ) -> OpResult {
        let zoom = zoom.unwrap_or(DEFAULT_CENTER_ZOOM);
        self.command(container_id, cancel, "center_on", 0, |globe| {
            globe.center_on(latitude, longitude, zoom).map(|()| 0)
        })
    }

    pub async fn set_level_of_detail(
        &self,
        container_id: &str,
        lod: u8,
        cancel: &CancellationToken,
    ) -> OpResult {
        self.command(container_id, cancel, "set_level_of_detail", 0, |globe| {
            globe.set_level_of_detail(lod).map(|()| 0)
        })
    }

    /// `speed` defaults to [`DEFAULT_ROTATION_SPEED`].
    pub async fn set_auto_rotation(
        &self,
        container_id: &str,
        enabled: bool,
        speed: Option<f64>,
        cancel: &CancellationToken,
    ) -> OpResult {
        let speed = speed.unwrap_or(DEFAULT_ROTATION_SPEED);
        self.command(container_id, cancel, "set_auto_rotation", 0, |globe| {
            globe.set_auto_rotation(enabled, speed).map(|()| 0)
        })
    }

    pub async fn clear(&self, container_id: &str, cancel: &CancellationToken) -> OpResult {
        self.command(container_id, cancel, "clear", 0, |globe| {
            globe.clear().map(|()| 0)
        })
    }

    pub async fn resize(
        &self,
        container_id: &str,
        width: u32,
        height: u32,
        cancel: &CancellationToken,
    ) -> OpResult {
        self.command(container_id, cancel, "resize", 0, |globe| {
            globe.resize(width, height).map(|()| 0)
        })
    }

    pub async fn set_light_intensity(
        &self,
        container_id: &str,
        light: LightKind,
        intensity: f64,
        cancel: &CancellationToken,
    ) -> OpResult {
        self.command(container_id, cancel, "set_light_intensity", 0, |globe| {
            globe.set_light_intensity(light, intensity).map(|()| 0)
        })
    }

    /// Participant under normalized device coordinates, if any. Failures and
    /// misses both yield `None`.
    pub async fn pick(
        &self,
        container_id: &str,
        ndc_x: f64,
        ndc_y: f64,
        cancel: &CancellationToken,
    ) -> Option<ParticipantPoint> {
        if cancel.is_cancelled() || !self.is_available() {
            return None;
        }
        let handle = self.registry.get(container_id)?;
        let picked = handle.lock().pick(ndc_x, ndc_y);
        match picked {
            Ok(hit) => hit,
            Err(err) => {
                debug!(%container_id, error = %err, "pick failed");
                None
            }
        }
    }

    /// Default shape for unknown, uninitialized and disposed globes.
    pub async fn get_state(&self, container_id: &str) -> GlobeInstanceState {
        match self.registry.get(container_id) {
            Some(handle) => handle.lock().state(),
            None => GlobeInstanceState::default(),
        }
    }

    /// Always succeeds, for unknown ids and repeated calls alike. Disposal
    /// runs even when `cancel` already fired so resources are never kept.
    pub async fn dispose(&self, container_id: &str, cancel: &CancellationToken) -> OpResult {
        let started = Instant::now();
        if cancel.is_cancelled() {
            debug!(%container_id, "dispose requested with a cancelled token");
        }
        if self.registry.remove(container_id) {
            info!(%container_id, "globe removed");
        }
        OpResult::ok(0, elapsed_ms(started))
    }

    /// Event stream for `container_id`. Subscribing before `initialize`
    /// is allowed and sees the `Ready` event.
    pub fn subscribe(&self, container_id: &str) -> broadcast::Receiver<Event<GlobeEvent>> {
        self.registry.get_or_create(container_id).lock().subscribe()
    }

    pub fn container_ids(&self) -> Vec<String> {
        self.registry.container_ids()
    }

    pub fn dispose_all(&self) {
        self.registry.dispose_all();
    }

    /// Shared envelope logic for synchronous instance commands.
    fn command(
        &self,
        container_id: &str,
        cancel: &CancellationToken,
        op: &'static str,
        unavailable_count: usize,
        apply: impl FnOnce(&mut GlobeInstance) -> Result<usize, GlobeError>,
    ) -> OpResult {
        let started = Instant::now();
        if cancel.is_cancelled() {
            return OpResult::failed(GlobeError::Cancelled.to_string(), elapsed_ms(started));
        }
        if !self.is_available() {
            debug!(%container_id, op, "backend unavailable, command has no visual effect");
            return OpResult::ok(unavailable_count, elapsed_ms(started));
        }

        let Some(handle) = self.registry.get(container_id) else {
            return OpResult::failed(GlobeError::NotReady.to_string(), elapsed_ms(started));
        };
        let applied = apply(&mut handle.lock());
        match applied {
            Ok(count) => {
                debug!(%container_id, op, count, "globe command applied");
                OpResult::ok(count, elapsed_ms(started))
            }
            Err(err) => {
                warn!(%container_id, op, error = %err, "globe command failed");
                OpResult::failed(err.to_string(), elapsed_ms(started))
            }
        }
    }
}

impl Drop for GlobeMediator {
    fn drop(&mut self) {
        self.registry.dispose_all();
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
