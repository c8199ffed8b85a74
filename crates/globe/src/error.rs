use crate::backend::{BackendError, BackendErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub enum GlobeError {
    /// Bad input; never retried.
    Validation { field: String, message: String },
    /// The instance is not in the `Ready` phase.
    NotReady,
    /// The rendering backend is not supported in this environment.
    BackendUnavailable(String),
    /// A bootstrap step failed in a way that may succeed on retry.
    TransientBootstrap(String),
    /// A rendering resource could not be created or uploaded.
    Resource(String),
    MountTargetMissing { container_id: String, attempts: u32 },
    InvalidState(String),
    DuplicateParticipant(String),
    ParticipantNotFound(String),
    Cancelled,
}

impl GlobeError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        GlobeError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Only transient bootstrap faults are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, GlobeError::TransientBootstrap(_))
    }
}

impl std::fmt::Display for GlobeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlobeError::Validation { field, message } => {
                write!(f, "invalid {field}: {message}")
            }
            GlobeError::NotReady => write!(f, "globe is not initialized"),
            GlobeError::BackendUnavailable(msg) => write!(f, "rendering backend unavailable: {msg}"),
            GlobeError::TransientBootstrap(msg) => write!(f, "globe bootstrap failed: {msg}"),
            GlobeError::Resource(msg) => write!(f, "rendering resource error: {msg}"),
            GlobeError::MountTargetMissing {
                container_id,
                attempts,
            } => write!(
                f,
                "container '{container_id}' not found after {attempts} attempts"
            ),
            GlobeError::InvalidState(msg) => write!(f, "invalid globe state: {msg}"),
            GlobeError::DuplicateParticipant(id) => {
                write!(f, "participant '{id}' is already on the globe")
            }
            GlobeError::ParticipantNotFound(id) => write!(f, "participant '{id}' not found"),
            GlobeError::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for GlobeError {}

impl From<BackendError> for GlobeError {
    fn from(err: BackendError) -> Self {
        match err.kind {
            BackendErrorKind::Unsupported => GlobeError::BackendUnavailable(err.message),
            BackendErrorKind::Transient => GlobeError::TransientBootstrap(err.message),
            BackendErrorKind::Resource => GlobeError::Resource(err.message),
        }
    }
}
