//! One globe bound to one host container.
//!
//! A `GlobeInstance` owns everything rendered into its container: the render
//! surface, the scene, the participant point cloud and the render-loop task.
//! It is shared as an [`InstanceHandle`]; every method runs inside one lock
//! acquisition and never awaits, so a command is applied whole and the next
//! rendered frame observes it.
//!
//! Lifecycle: `Uninitialized -> Initializing -> Ready -> Disposed`. A failed
//! or cancelled bootstrap goes back to `Uninitialized`. Commands other than
//! `state` and `dispose` require `Ready`.

use std::sync::Arc;
use std::time::Duration;

use foundation::math::{Vec2, lat_lng_to_position};
use parking_lot::Mutex;
use runtime::event_bus::{Event, EventBus};
use runtime::frame::Frame;
use runtime::metrics::{FpsMeter, Metrics};
use scene::camera::Camera;
use scene::graph::LightKind;
use scene::picking::{DEFAULT_PICK_THRESHOLD, PointPick, pick_point};
use scene::point_cloud::{POINT_RENDER_RADIUS, ParticipantPoint, PointCloud};
use scene::prefabs::{EARTH_RADIUS, GlobeScene};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{DrawFrame, RenderSurface};
use crate::error::GlobeError;
use crate::events::GlobeEvent;
use crate::options::{GlobeOptions, MAX_LEVEL_OF_DETAIL};
use crate::results::{CameraState, GlobeInstanceState};
use crate::validation::{check_coordinates, check_point, check_points};

pub type InstanceHandle = Arc<Mutex<GlobeInstance>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    Disposed,
}

/// Resources acquired by a successful bootstrap.
pub struct ReadyParts {
    pub options: GlobeOptions,
    pub scene: GlobeScene,
    pub surface: Box<dyn RenderSurface>,
    pub backend_version: String,
}

/// What the render loop should do after a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Stop,
}

pub struct GlobeInstance {
    container_id: String,
    phase: Phase,
    options: Option<GlobeOptions>,
    globe_id: Option<String>,
    backend_version: Option<String>,
    surface: Option<Box<dyn RenderSurface>>,
    scene: Option<GlobeScene>,
    points: PointCloud,
    uploaded_generation: Option<u64>,
    camera: Camera,
    camera_animation: Duration,
    auto_rotating: bool,
    rotation_speed: f64,
    level_of_detail: u8,
    country_count: usize,
    frame: Frame,
    fps: FpsMeter,
    metrics: Metrics,
    events: EventBus<GlobeEvent>,
    render_task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for GlobeInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobeInstance")
            .field("container_id", &self.container_id)
            .field("phase", &self.phase)
            .field("globe_id", &self.globe_id)
            .field("points", &self.points.len())
            .field("frame", &self.frame.index)
            .finish()
    }
}

impl GlobeInstance {
    pub fn new(
        container_id: impl Into<String>,
        camera_animation: Duration,
        event_capacity: usize,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            phase: Phase::Uninitialized,
            options: None,
            globe_id: None,
            backend_version: None,
            surface: None,
            scene: None,
            points: PointCloud::new(),
            uploaded_generation: None,
            camera: Camera::default(),
            camera_animation,
            auto_rotating: false,
            rotation_speed: 0.0,
            level_of_detail: 0,
            country_count: 0,
            frame: Frame::new(),
            fps: FpsMeter::default(),
            metrics: Metrics::new(),
            events: EventBus::with_capacity(event_capacity),
            render_task: None,
        }
    }

    pub fn handle(self) -> InstanceHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn options(&self) -> Option<&GlobeOptions> {
        self.options.as_ref()
    }

    pub fn backend_version(&self) -> Option<&str> {
        self.backend_version.as_deref()
    }

    pub fn globe_id(&self) -> Option<&str> {
        self.globe_id.as_deref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event<GlobeEvent>> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn participants(&self) -> Vec<ParticipantPoint> {
        self.points.snapshot()
    }

    pub fn scene(&self) -> Option<&GlobeScene> {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn earth_rotation(&self) -> f64 {
        self.scene.as_ref().map(|s| s.earth_rotation()).unwrap_or(0.0)
    }

    pub fn cloud_rotation(&self) -> f64 {
        self.scene.as_ref().map(|s| s.cloud_rotation()).unwrap_or(0.0)
    }

    pub fn light_intensity(&self, kind: LightKind) -> Option<f64> {
        self.scene.as_ref()?.light(kind).map(|l| l.intensity)
    }

    pub(crate) fn begin_initialize(&mut self) -> Result<(), GlobeError> {
        match self.phase {
            Phase::Uninitialized => {
                self.phase = Phase::Initializing;
                Ok(())
            }
            Phase::Initializing => Err(GlobeError::InvalidState(
                "initialization already in progress".into(),
            )),
            Phase::Ready => Err(GlobeError::InvalidState("globe is already initialized".into())),
            Phase::Disposed => Err(GlobeError::InvalidState("globe has been disposed".into())),
        }
    }

    /// Rolls a failed or cancelled bootstrap back. A dispose that happened
    /// meanwhile wins.
    pub(crate) fn abort_initialize(&mut self) {
        if self.phase == Phase::Initializing {
            self.phase = Phase::Uninitialized;
        }
    }

    /// Publishes bootstrap results. If the instance left `Initializing`
    /// meanwhile, the surface is released and the commit fails.
    pub(crate) fn commit_ready(&mut self, parts: ReadyParts) -> Result<String, GlobeError> {
        let ReadyParts {
            options,
            scene,
            mut surface,
            backend_version,
        } = parts;

        if self.phase != Phase::Initializing {
            surface.release();
            return Err(GlobeError::InvalidState(format!(
                "globe left initialization while bootstrapping ({:?})",
                self.phase
            )));
        }

        let globe_id = uuid::Uuid::new_v4().to_string();
        self.camera = Camera::new(options.aspect());
        self.auto_rotating = options.auto_rotate;
        self.rotation_speed = options.auto_rotate_speed;
        self.level_of_detail = options.level_of_detail;
        self.uploaded_generation = None;
        self.frame = Frame::new();
        self.fps.reset();
        self.metrics.clear();
        self.surface = Some(surface);
        self.scene = Some(scene);
        self.options = Some(options);
        self.backend_version = Some(backend_version);
        self.globe_id = Some(globe_id.clone());
        self.phase = Phase::Ready;

        info!(container_id = %self.container_id, %globe_id, "globe ready");
        self.events.emit(
            self.frame,
            GlobeEvent::Ready {
                container_id: self.container_id.clone(),
                globe_id: globe_id.clone(),
            },
        );
        Ok(globe_id)
    }

    /// Stores the render-loop task so `dispose` can stop it.
    pub(crate) fn attach_render_task(&mut self, task: JoinHandle<()>) {
        if self.phase != Phase::Ready {
            task.abort();
            return;
        }
        if let Some(previous) = self.render_task.replace(task) {
            previous.abort();
        }
    }

    fn require_ready(&self) -> Result<(), GlobeError> {
        if self.phase == Phase::Ready {
            Ok(())
        } else {
            Err(GlobeError::NotReady)
        }
    }

    /// Replaces every participant. The batch is validated first; a bad point
    /// rejects all of it.
    pub fn add_participants(&mut self, points: Vec<ParticipantPoint>) -> Result<usize, GlobeError> {
        self.require_ready()?;
        check_points(&points)?;
        let count = points.len();
        self.points.replace_all(points);
        debug!(container_id = %self.container_id, count, "participants replaced");
        self.state_changed();
        Ok(count)
    }

    pub fn add_participant(&mut self, point: ParticipantPoint) -> Result<(), GlobeError> {
        self.require_ready()?;
        check_point(&point)?;
        let id = point.id.clone();
        if !self.points.add_one(point) {
            return Err(GlobeError::DuplicateParticipant(id));
        }
        self.state_changed();
        Ok(())
    }

    pub fn remove_participant(&mut self, id: &str) -> Result<(), GlobeError> {
        self.require_ready()?;
        if !self.points.remove_one(id) {
            return Err(GlobeError::ParticipantNotFound(id.to_string()));
        }
        self.state_changed();
        Ok(())
    }

    pub fn update_position(
        &mut self,
        id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), GlobeError> {
        self.require_ready()?;
        check_coordinates(latitude, longitude)?;
        if !self.points.update_position(id, latitude, longitude) {
            return Err(GlobeError::ParticipantNotFound(id.to_string()));
        }
        self.state_changed();
        Ok(())
    }

    /// Animates the camera to hover over `(latitude, longitude)` at distance
    /// `zoom`, clamped to the configured zoom range.
    pub fn center_on(
        &mut self,
        latitude: f64,
        longitude: f64,
        zoom: f64,
    ) -> Result<(), GlobeError> {
        self.require_ready()?;
        check_coordinates(latitude, longitude)?;
        if !zoom.is_finite() {
            return Err(GlobeError::validation("zoom", "must be a finite number"));
        }
        let zoom = match &self.options {
            Some(options) => options.clamp_zoom(zoom),
            None => zoom,
        };
        let target = lat_lng_to_position(latitude, longitude, zoom);
        self.camera.animate_to(target, self.camera_animation.as_secs_f64());
        Ok(())
    }

    pub fn set_level_of_detail(&mut self, lod: u8) -> Result<(), GlobeError> {
        self.require_ready()?;
        if lod > MAX_LEVEL_OF_DETAIL {
            return Err(GlobeError::validation(
                "levelOfDetail",
                format!("must be between 0 and {MAX_LEVEL_OF_DETAIL}"),
            ));
        }
        self.edit_scene(|scene| {
            scene.set_level_of_detail(lod);
            true
        })?;
        self.level_of_detail = lod;
        self.state_changed();
        Ok(())
    }

    pub fn set_auto_rotation(&mut self, enabled: bool, speed: f64) -> Result<(), GlobeError> {
        self.require_ready()?;
        if !speed.is_finite() || speed < 0.0 {
            return Err(GlobeError::validation(
                "speed",
                "must be a finite, non-negative number",
            ));
        }
        self.auto_rotating = enabled;
        self.rotation_speed = speed;
        self.state_changed();
        Ok(())
    }

    /// Removes every participant and country.
    pub fn clear(&mut self) -> Result<(), GlobeError> {
        self.require_ready()?;
        self.points.clear();
        self.country_count = 0;
        self.state_changed();
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GlobeError> {
        self.require_ready()?;
        if width == 0 || height == 0 {
            return Err(GlobeError::validation(
                "size",
                format!("{width}x{height} is not a drawable size"),
            ));
        }
        self.camera.set_aspect(width as f64 / height as f64);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }
        Ok(())
    }

    pub fn set_light_intensity(
        &mut self,
        kind: LightKind,
        intensity: f64,
    ) -> Result<(), GlobeError> {
        self.require_ready()?;
        if !intensity.is_finite() || intensity < 0.0 {
            return Err(GlobeError::validation(
                "intensity",
                "must be a finite, non-negative number",
            ));
        }
        let changed = self.edit_scene(|scene| scene.set_light_intensity(kind, intensity))?;
        if !changed {
            return Err(GlobeError::InvalidState(format!("scene has no {kind:?} light")));
        }
        Ok(())
    }

    /// Finds the participant under normalized device coordinates and emits
    /// `ParticipantSelected` when there is one.
    pub fn pick(&mut self, ndc_x: f64, ndc_y: f64) -> Result<Option<ParticipantPoint>, GlobeError> {
        self.require_ready()?;
        let in_range = |v: f64| v.is_finite() && (-1.0..=1.0).contains(&v);
        if !in_range(ndc_x) || !in_range(ndc_y) {
            return Err(GlobeError::validation(
                "ndc",
                "coordinates must be within [-1, 1]",
            ));
        }

        let Some(ray) = self.camera.ray_from_ndc(Vec2::new(ndc_x, ndc_y)) else {
            return Ok(None);
        };
        let opts = PointPick {
            rotation_y: self.earth_rotation(),
            radius: POINT_RENDER_RADIUS,
            threshold: DEFAULT_PICK_THRESHOLD,
            occluder_radius: EARTH_RADIUS,
        };
        let Some(hit) = pick_point(&self.points, ray, opts) else {
            return Ok(None);
        };
        let Some(participant) = self.points.point_at(hit.index).cloned() else {
            return Ok(None);
        };

        self.events.emit(
            self.frame,
            GlobeEvent::ParticipantSelected {
                container_id: self.container_id.clone(),
                participant: participant.clone(),
            },
        );
        Ok(Some(participant))
    }

    /// Stops rendering and frees everything the instance owns. Safe to call
    /// in any phase, any number of times.
    pub fn dispose(&mut self) {
        if let Some(task) = self.render_task.take() {
            task.abort();
        }
        if let Some(mut surface) = self.surface.take() {
            surface.release();
        }
        let was_ready = self.phase == Phase::Ready;

        self.scene = None;
        self.points.clear();
        self.uploaded_generation = None;
        self.country_count = 0;
        self.camera = Camera::default();
        self.auto_rotating = false;
        self.level_of_detail = 0;
        self.fps.reset();
        self.globe_id = None;
        self.phase = Phase::Disposed;

        if was_ready {
            info!(
                container_id = %self.container_id,
                metrics = ?self.metrics.snapshot(),
                "globe disposed"
            );
            self.state_changed();
        }
    }

    /// Host-facing snapshot; the default shape unless `Ready`.
    pub fn state(&self) -> GlobeInstanceState {
        if self.phase != Phase::Ready {
            return GlobeInstanceState::default();
        }
        GlobeInstanceState {
            globe_id: self.globe_id.clone(),
            is_initialized: true,
            is_auto_rotating: self.auto_rotating,
            current_level_of_detail: self.level_of_detail,
            participant_count: self.points.len(),
            country_count: self.country_count,
            camera: CameraState::from_camera(&self.camera),
            frames_per_second: self.fps.fps(),
        }
    }

    /// Advances and draws one frame.
    ///
    /// Upload and draw failures are reported as `Error` events; they never
    /// stop the loop. Only leaving `Ready` does.
    pub fn render_frame(&mut self, dt_s: f64) -> FrameOutcome {
        if self.phase != Phase::Ready {
            return FrameOutcome::Stop;
        }
        self.frame = self.frame.advance(dt_s);
        let dt = self.frame.dt_s;

        let clouds_speed = self.options.as_ref().map(|o| o.clouds_speed).unwrap_or(0.0);
        if let Some(scene) = self.scene.as_mut() {
            if self.auto_rotating {
                scene.set_earth_rotation(scene.earth_rotation() + dt * self.rotation_speed);
            }
            scene.set_cloud_rotation(scene.cloud_rotation() + dt * clouds_speed);
        }
        self.camera.step(dt);

        let generation = self.points.generation();
        if self.uploaded_generation != Some(generation) {
            let buffer = self.points.buffer(POINT_RENDER_RADIUS);
            let uploaded = match self.surface.as_mut() {
                Some(surface) => surface.upload_points(&buffer),
                None => Ok(()),
            };
            match uploaded {
                Ok(()) => {
                    self.uploaded_generation = Some(generation);
                    self.metrics.inc_counter("point_uploads", 1);
                }
                Err(err) => self.report_error(format!("point upload failed: {err}")),
            }
        }

        self.fps.record(dt);
        self.metrics.inc_counter("frames", 1);
        self.metrics.set_gauge("participants", self.points.len() as i64);

        let draw = DrawFrame {
            frame_index: self.frame.index,
            camera_position: self.camera.position,
            camera_target: self.camera.target,
            earth_rotation: self.earth_rotation(),
            cloud_rotation: self.cloud_rotation(),
            point_count: self.points.len(),
        };
        let drawn = match self.surface.as_mut() {
            Some(surface) => surface.draw(&draw),
            None => Ok(()),
        };
        if let Err(err) = drawn {
            self.metrics.inc_counter("draw_errors", 1);
            self.report_error(format!("draw failed: {err}"));
        }
        FrameOutcome::Continue
    }

    /// Applies `edit` to a copy of the scene and keeps the copy only once the
    /// surface accepted it. `Ok(false)` when `edit` declined to change it.
    fn edit_scene(
        &mut self,
        edit: impl FnOnce(&mut GlobeScene) -> bool,
    ) -> Result<bool, GlobeError> {
        let Some(current) = self.scene.as_ref() else {
            return Ok(false);
        };
        let mut next = current.clone();
        if !edit(&mut next) {
            return Ok(false);
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.upload_scene(&next)?;
        }
        self.scene = Some(next);
        Ok(true)
    }

    fn report_error(&mut self, message: String) {
        warn!(container_id = %self.container_id, frame = self.frame.index, %message, "render error");
        self.events.emit(
            self.frame,
            GlobeEvent::Error {
                container_id: self.container_id.clone(),
                message,
            },
        );
    }

    fn state_changed(&mut self) {
        if self.events.subscriber_count() == 0 {
            return;
        }
        let state = self.state();
        self.events.emit(
            self.frame,
            GlobeEvent::StateChanged {
                container_id: self.container_id.clone(),
                state,
            },
        );
    }
}

impl Drop for GlobeInstance {
    fn drop(&mut self) {
        if let Some(task) = self.render_task.take() {
            task.abort();
        }
        if let Some(mut surface) = self.surface.take() {
            surface.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::{MountTarget, RenderBackend};
    use crate::headless::HeadlessBackend;
    use scene::graph::NodeKind;
    use scene::prefabs::build_globe_scene;

    fn ready_instance(backend: &HeadlessBackend) -> GlobeInstance {
        let mut instance = GlobeInstance::new("globe", Duration::from_millis(1000), 16);
        let options = GlobeOptions::default();
        let scene = build_globe_scene(&options.scene_desc().unwrap());
        let mount = MountTarget {
            container_id: "globe".into(),
        };
        let surface = backend.create_surface(&mount, 800, 600).unwrap();
        instance.begin_initialize().unwrap();
        instance
            .commit_ready(ReadyParts {
                options,
                scene,
                surface,
                backend_version: "test".into(),
            })
            .unwrap();
        instance
    }

    fn alice() -> ParticipantPoint {
        ParticipantPoint::new("a", "Alice", 55.75, 37.61)
    }

    #[test]
    fn commands_before_ready_are_rejected() {
        let mut instance = GlobeInstance::new("globe", Duration::from_secs(1), 16);
        assert_eq!(instance.add_participant(alice()), Err(GlobeError::NotReady));
        assert_eq!(instance.clear(), Err(GlobeError::NotReady));
        assert_eq!(instance.center_on(0.0, 0.0, 2.0), Err(GlobeError::NotReady));
        assert_eq!(instance.render_frame(0.016), FrameOutcome::Stop);
        assert_eq!(instance.state(), GlobeInstanceState::default());
    }

    #[test]
    fn participant_commands_mutate_count() {
        let backend = HeadlessBackend::new();
        let mut instance = ready_instance(&backend);
        instance.add_participant(alice()).unwrap();
        assert_eq!(
            instance.add_participant(alice()),
            Err(GlobeError::DuplicateParticipant("a".into()))
        );
        assert_eq!(instance.state().participant_count, 1);

        instance.update_position("a", 48.85, 2.35).unwrap();
        assert_eq!(instance.participants()[0].latitude, 48.85);

        instance.remove_participant("a").unwrap();
        assert_eq!(
            instance.remove_participant("a"),
            Err(GlobeError::ParticipantNotFound("a".into()))
        );
        assert_eq!(instance.state().participant_count, 0);
    }

    #[test]
    fn bad_batch_leaves_points_untouched() {
        let backend = HeadlessBackend::new();
        let mut instance = ready_instance(&backend);
        instance.add_participants(vec![alice()]).unwrap();

        let bad = ParticipantPoint::new("b", "Bob", 120.0, 0.0);
        assert!(instance.add_participants(vec![bad]).is_err());
        assert_eq!(instance.participants(), vec![alice()]);
    }

    #[test]
    fn frames_upload_points_once_per_generation() {
        let backend = HeadlessBackend::new();
        let stats = backend.stats();
        let mut instance = ready_instance(&backend);

        instance.render_frame(0.016);
        instance.render_frame(0.016);
        assert_eq!(stats.point_uploads(), 1);

        instance.add_participant(alice()).unwrap();
        instance.render_frame(0.016);
        assert_eq!(stats.point_uploads(), 2);
        assert_eq!(stats.last_points().unwrap().len(), 1);
        assert_eq!(stats.draws(), 3);
    }

    #[test]
    fn auto_rotation_advances_earth() {
        let backend = HeadlessBackend::new();
        let mut instance = ready_instance(&backend);
        instance.render_frame(0.1);
        assert!((instance.earth_rotation() - 0.01).abs() < 1e-12);

        instance.set_auto_rotation(false, 0.5).unwrap();
        instance.render_frame(0.1);
        assert!((instance.earth_rotation() - 0.01).abs() < 1e-12);
        assert!(!instance.state().is_auto_rotating);
    }

    #[test]
    fn center_on_clamps_zoom() {
        let backend = HeadlessBackend::new();
        let mut instance = ready_instance(&backend);
        instance.center_on(0.0, 0.0, 100.0).unwrap();
        for _ in 0..100 {
            instance.render_frame(0.016);
        }
        let camera = instance.state().camera;
        assert!((camera.zoom - 4.0).abs() < 1e-9);
        assert!(camera.center_latitude.abs() < 1e-9);
        assert!(camera.center_longitude.abs() < 1e-9);
    }

    #[test]
    fn draw_errors_become_events() {
        let backend = HeadlessBackend::new().failing_draws();
        let mut instance = ready_instance(&backend);
        let mut rx = instance.subscribe();
        assert_eq!(instance.render_frame(0.016), FrameOutcome::Continue);

        let event = rx.try_recv().unwrap();
        assert!(matches!(event.payload, GlobeEvent::Error { .. }));
        assert_eq!(instance.metrics().counter("draw_errors"), 1);
    }

    #[test]
    fn dispose_releases_once_and_resets_state() {
        let backend = HeadlessBackend::new();
        let stats = backend.stats();
        let mut instance = ready_instance(&backend);
        instance.add_participant(alice()).unwrap();
        assert_eq!(stats.live_surfaces(), 1);

        instance.dispose();
        instance.dispose();
        assert_eq!(stats.live_surfaces(), 0);
        assert_eq!(instance.phase(), Phase::Disposed);
        assert_eq!(instance.state(), GlobeInstanceState::default());
        assert!(instance.participants().is_empty());
        assert!(instance.begin_initialize().is_err());
    }

    #[test]
    fn commit_after_dispose_releases_surface() {
        let backend = HeadlessBackend::new();
        let stats = backend.stats();
        let mut instance = GlobeInstance::new("globe", Duration::from_secs(1), 16);
        instance.begin_initialize().unwrap();
        instance.dispose();

        let options = GlobeOptions::default();
        let scene = build_globe_scene(&options.scene_desc().unwrap());
        let mount = MountTarget {
            container_id: "globe".into(),
        };
        let surface = backend.create_surface(&mount, 800, 600).unwrap();
        let result = instance.commit_ready(ReadyParts {
            options,
            scene,
            surface,
            backend_version: "test".into(),
        });
        assert!(matches!(result, Err(GlobeError::InvalidState(_))));
        assert_eq!(stats.live_surfaces(), 0);
    }

    #[test]
    fn pick_emits_selection() {
        let backend = HeadlessBackend::new();
        let mut instance = ready_instance(&backend);
        instance.set_auto_rotation(false, 0.0).unwrap();
        // Faces the default camera on +Z.
        let front = ParticipantPoint::new("f", "Front", 0.0, -90.0);
        instance.add_participant(front.clone()).unwrap();

        let mut rx = instance.subscribe();
        assert_eq!(instance.pick(0.0, 0.0).unwrap(), Some(front));
        let event = rx.try_recv().unwrap();
        assert!(matches!(event.payload, GlobeEvent::ParticipantSelected { .. }));
        assert_eq!(instance.pick(0.9, 0.9).unwrap(), None);
        assert!(instance.pick(2.0, 0.0).is_err());
    }

    #[test]
    fn light_and_lod_changes_reupload_scene() {
        let backend = HeadlessBackend::new();
        let stats = backend.stats();
        let mut instance = ready_instance(&backend);
        let before = stats.scene_uploads();

        instance.set_light_intensity(LightKind::Sun, 1.5).unwrap();
        instance.set_level_of_detail(3).unwrap();
        assert_eq!(stats.scene_uploads(), before + 2);
        assert_eq!(instance.light_intensity(LightKind::Sun), Some(1.5));
        assert_eq!(instance.state().current_level_of_detail, 3);
        assert!(instance.set_level_of_detail(4).is_err());
        assert!(instance.set_light_intensity(LightKind::Ambient, -1.0).is_err());
    }

    #[test]
    fn rejected_scene_upload_keeps_previous_scene() {
        let backend = HeadlessBackend::new().failing_scene_uploads();
        let mut instance = ready_instance(&backend);
        let earth_segments = |instance: &GlobeInstance| {
            let scene = instance.scene().unwrap();
            match &scene.graph.node(scene.earth).unwrap().kind {
                NodeKind::Sphere(mesh) => mesh.segments,
                other => panic!("earth is not a sphere: {other:?}"),
            }
        };
        assert_eq!(earth_segments(&instance), 64);

        let err = instance.set_light_intensity(LightKind::Sun, 0.25).unwrap_err();
        assert!(matches!(err, GlobeError::Resource(_)));
        assert_eq!(instance.light_intensity(LightKind::Sun), Some(3.0));

        assert!(instance.set_level_of_detail(0).is_err());
        assert_eq!(instance.state().current_level_of_detail, 2);
        assert_eq!(earth_segments(&instance), 64);
    }

    #[test]
    fn participant_mutations_report_state_changes() {
        let backend = HeadlessBackend::new();
        let mut instance = ready_instance(&backend);
        let mut rx = instance.subscribe();
        let next_count = |rx: &mut broadcast::Receiver<Event<GlobeEvent>>| {
            match rx.try_recv().unwrap().payload {
                GlobeEvent::StateChanged { state, .. } => state.participant_count,
                other => panic!("unexpected event {other:?}"),
            }
        };

        instance.add_participant(alice()).unwrap();
        assert_eq!(next_count(&mut rx), 1);
        instance.update_position("a", 10.0, 20.0).unwrap();
        assert_eq!(next_count(&mut rx), 1);
        instance.remove_participant("a").unwrap();
        assert_eq!(next_count(&mut rx), 0);
        assert!(rx.try_recv().is_err());
    }
}
