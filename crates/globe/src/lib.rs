//! Per-container 3D globe runtime.
//!
//! A host addresses globes by container id through [`GlobeMediator`]. Each
//! container maps to one [`GlobeInstance`] in the [`InstanceRegistry`]; the
//! instance owns its render surface, scene, participant point cloud and
//! render-loop task. Rendering goes through the [`RenderBackend`] seam, with
//! [`HeadlessBackend`] as the in-process implementation.

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod events;
pub mod geocoding;
pub mod headless;
pub mod host;
pub mod instance;
pub mod mediator;
pub mod options;
pub mod registry;
pub mod render_loop;
pub mod repository;
pub mod results;
pub mod validation;

pub use backend::{BackendError, BackendErrorKind, BackendInfo, RenderBackend, RenderSurface};
pub use config::MediatorConfig;
pub use error::GlobeError;
pub use events::GlobeEvent;
pub use headless::HeadlessBackend;
pub use host::CommunityHost;
pub use instance::{GlobeInstance, InstanceHandle, Phase};
pub use mediator::GlobeMediator;
pub use options::GlobeOptions;
pub use registry::InstanceRegistry;
pub use results::{CameraState, GlobeInstanceState, InitResult, OpResult};
pub use scene::point_cloud::ParticipantPoint;
