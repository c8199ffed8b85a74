//! Bringing a globe from `Uninitialized` to `Ready`.
//!
//! Every suspension point (library load, mount polling, retry backoff) races
//! the caller's cancellation token. The instance lock is only taken for the
//! short synchronous phase transitions, never across an await.

use std::future::Future;
use std::sync::Arc;

use scene::prefabs::build_globe_scene;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{MountTarget, RenderBackend};
use crate::config::MediatorConfig;
use crate::error::GlobeError;
use crate::instance::{InstanceHandle, Phase, ReadyParts};
use crate::options::GlobeOptions;
use crate::render_loop;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrapped {
    pub globe_id: String,
    pub backend_version: String,
    pub attempts: u32,
}

/// Runs [`initialize`] and retries transient failures with linear backoff.
pub async fn initialize_with_retry(
    handle: &InstanceHandle,
    backend: &dyn RenderBackend,
    options: &GlobeOptions,
    config: &MediatorConfig,
    cancel: &CancellationToken,
) -> Result<Bootstrapped, GlobeError> {
    let attempts = config.bootstrap_attempts.max(1);
    let mut attempt = 1;
    loop {
        match initialize(handle, backend, options, config, cancel).await {
            Ok(mut done) => {
                done.attempts = attempt;
                return Ok(done);
            }
            Err(err) if err.is_transient() && attempt < attempts => {
                let backoff = config.bootstrap_backoff * attempt;
                warn!(
                    attempt,
                    max_attempts = attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "globe bootstrap failed, retrying"
                );
                cancellable(cancel, tokio::time::sleep(backoff)).await?;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// One bootstrap attempt. On failure the instance is back in
/// `Uninitialized` (unless it was disposed meanwhile) and holds nothing.
pub async fn initialize(
    handle: &InstanceHandle,
    backend: &dyn RenderBackend,
    options: &GlobeOptions,
    config: &MediatorConfig,
    cancel: &CancellationToken,
) -> Result<Bootstrapped, GlobeError> {
    if cancel.is_cancelled() {
        return Err(GlobeError::Cancelled);
    }
    let desc = options.scene_desc()?;
    let container_id = {
        let mut instance = handle.lock();
        instance.begin_initialize()?;
        instance.container_id().to_string()
    };

    let acquired = acquire(handle, backend, options, &desc, &container_id, config, cancel).await;
    let parts = match acquired {
        Ok(parts) => parts,
        Err(err) => {
            handle.lock().abort_initialize();
            debug!(%container_id, error = %err, "bootstrap attempt failed");
            return Err(err);
        }
    };

    let backend_version = parts.backend_version.clone();
    let committed = handle.lock().commit_ready(parts);
    let globe_id = match committed {
        Ok(id) => id,
        Err(err) => {
            handle.lock().abort_initialize();
            return Err(err);
        }
    };

    let task = render_loop::spawn(Arc::downgrade(handle), config.frame_interval);
    handle.lock().attach_render_task(task);
    info!(%container_id, %globe_id, backend = backend.name(), "globe initialized");

    Ok(Bootstrapped {
        globe_id,
        backend_version,
        attempts: 1,
    })
}

async fn acquire(
    handle: &InstanceHandle,
    backend: &dyn RenderBackend,
    options: &GlobeOptions,
    desc: &scene::prefabs::GlobeSceneDesc,
    container_id: &str,
    config: &MediatorConfig,
    cancel: &CancellationToken,
) -> Result<ReadyParts, GlobeError> {
    if !backend.is_supported() {
        return Err(GlobeError::BackendUnavailable(format!(
            "{} is not supported here",
            backend.name()
        )));
    }

    let info = cancellable(cancel, backend.load()).await??;
    ensure_initializing(handle)?;

    let mount = wait_for_mount(handle, backend, container_id, config, cancel).await?;

    let mut surface = backend.create_surface(&mount, options.width, options.height)?;
    let scene = build_globe_scene(desc);
    if let Err(err) = surface.upload_scene(&scene) {
        surface.release();
        return Err(GlobeError::Resource(err.message));
    }
    if cancel.is_cancelled() {
        surface.release();
        return Err(GlobeError::Cancelled);
    }

    Ok(ReadyParts {
        options: options.clone(),
        scene,
        surface,
        backend_version: info.version,
    })
}

/// Polls for the host container with real delays between lookups.
async fn wait_for_mount(
    handle: &InstanceHandle,
    backend: &dyn RenderBackend,
    container_id: &str,
    config: &MediatorConfig,
    cancel: &CancellationToken,
) -> Result<MountTarget, GlobeError> {
    let attempts = config.mount_poll_attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(mount) = backend.find_mount(container_id) {
            if attempt > 1 {
                debug!(%container_id, attempt, "container mounted");
            }
            return Ok(mount);
        }
        if attempt < attempts {
            cancellable(cancel, tokio::time::sleep(config.mount_poll_interval)).await?;
            ensure_initializing(handle)?;
        }
    }
    Err(GlobeError::MountTargetMissing {
        container_id: container_id.to_string(),
        attempts,
    })
}

fn ensure_initializing(handle: &InstanceHandle) -> Result<(), GlobeError> {
    match handle.lock().phase() {
        Phase::Initializing => Ok(()),
        other => Err(GlobeError::InvalidState(format!(
            "globe left initialization while bootstrapping ({other:?})"
        ))),
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, GlobeError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GlobeError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::headless::HeadlessBackend;
    use crate::instance::GlobeInstance;

    fn handle() -> InstanceHandle {
        GlobeInstance::new("globe", Duration::from_secs(1), 16).handle()
    }

    #[tokio::test(start_paused = true)]
    async fn ready_after_late_mount() {
        let backend = HeadlessBackend::new().mount_after(3);
        let handle = handle();
        let config = MediatorConfig::default();
        let started = tokio::time::Instant::now();

        let done = initialize(
            &handle,
            &backend,
            &GlobeOptions::default(),
            &config,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(done.backend_version, crate::headless::HEADLESS_VERSION);
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(handle.lock().phase(), Phase::Ready);
        handle.lock().dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn missing_mount_gives_up_after_ceiling() {
        let backend = HeadlessBackend::new().never_mount();
        let handle = handle();
        let config = MediatorConfig {
            mount_poll_attempts: 5,
            ..MediatorConfig::default()
        };
        let err = initialize(
            &handle,
            &backend,
            &GlobeOptions::default(),
            &config,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            GlobeError::MountTargetMissing {
                container_id: "globe".into(),
                attempts: 5
            }
        );
        assert_eq!(handle.lock().phase(), Phase::Uninitialized);
        assert_eq!(backend.stats().live_surfaces(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_loads_are_retried() {
        let backend = HeadlessBackend::new().failing_loads(2);
        let handle = handle();
        let done = initialize_with_retry(
            &handle,
            &backend,
            &GlobeOptions::default(),
            &MediatorConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(done.attempts, 3);
        assert_eq!(backend.stats().load_attempts(), 3);
        handle.lock().dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn retry_backoff_grows_linearly() {
        let backend = HeadlessBackend::new().failing_loads(2);
        let handle = handle();
        let started = tokio::time::Instant::now();
        initialize_with_retry(
            &handle,
            &backend,
            &GlobeOptions::default(),
            &MediatorConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        // 500 ms after the first failure, 1000 ms after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2000), "{elapsed:?}");
        handle.lock().dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_is_bounded() {
        let backend = HeadlessBackend::new().failing_loads(5);
        let handle = handle();
        let err = initialize_with_retry(
            &handle,
            &backend,
            &GlobeOptions::default(),
            &MediatorConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(backend.stats().load_attempts(), 3);
        assert_eq!(handle.lock().phase(), Phase::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_faults_are_not_retried() {
        let backend = HeadlessBackend::new().unsupported();
        let handle = handle();
        let err = initialize_with_retry(
            &handle,
            &backend,
            &GlobeOptions::default(),
            &MediatorConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GlobeError::BackendUnavailable(_)));
        assert_eq!(backend.stats().load_attempts(), 0);

        let bad = GlobeOptions {
            level_of_detail: 7,
            ..GlobeOptions::default()
        };
        let backend = HeadlessBackend::new();
        let err = initialize_with_retry(
            &handle,
            &backend,
            &bad,
            &MediatorConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GlobeError::Validation { .. }));
        assert_eq!(handle.lock().phase(), Phase::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn faulty_texture_releases_surface() {
        let backend = HeadlessBackend::new().faulty_texture("broken.jpg");
        let handle = handle();
        let options = GlobeOptions {
            earth_texture_url: Some("broken.jpg".into()),
            ..GlobeOptions::default()
        };
        let err = initialize(
            &handle,
            &backend,
            &options,
            &MediatorConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GlobeError::Resource(_)));
        assert_eq!(backend.stats().surfaces_created(), 1);
        assert_eq!(backend.stats().live_surfaces(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_load_leaves_uninitialized() {
        let backend = HeadlessBackend::new().load_delay(Duration::from_secs(5));
        let handle = handle();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = initialize(
            &handle,
            &backend,
            &GlobeOptions::default(),
            &MediatorConfig::default(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert_eq!(err, GlobeError::Cancelled);
        assert_eq!(handle.lock().phase(), Phase::Uninitialized);
        assert_eq!(backend.stats().surfaces_created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_during_mount_wait_aborts() {
        let backend = Arc::new(HeadlessBackend::new().mount_after(10));
        let handle = handle();
        let disposer = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            disposer.lock().dispose();
        });

        let err = initialize(
            &handle,
            backend.as_ref(),
            &GlobeOptions::default(),
            &MediatorConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GlobeError::InvalidState(_)));
        assert_eq!(handle.lock().phase(), Phase::Disposed);
        assert_eq!(backend.stats().live_surfaces(), 0);
    }
}
