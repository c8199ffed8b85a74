use scene::camera::{Camera, DEFAULT_CAMERA_DISTANCE};
use serde::{Deserialize, Serialize};

/// Outcome envelope of every mediator operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub processed_count: usize,
    pub execution_time_ms: u64,
}

impl OpResult {
    pub fn ok(processed_count: usize, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            error_message: None,
            processed_count,
            execution_time_ms,
        }
    }

    pub fn failed(message: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            processed_count: 0,
            execution_time_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub globe_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_version: Option<String>,
}

impl InitResult {
    pub fn ok(globe_id: String, backend_version: String) -> Self {
        Self {
            success: true,
            error_message: None,
            globe_id: Some(globe_id),
            backend_version: Some(backend_version),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            globe_id: None,
            backend_version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub zoom: f64,
    pub center_latitude: f64,
    pub center_longitude: f64,
}

impl CameraState {
    pub fn from_camera(camera: &Camera) -> Self {
        let (center_latitude, center_longitude) = camera.center_lat_lng();
        Self {
            position: camera.position.as_array(),
            target: camera.target.as_array(),
            zoom: camera.distance(),
            center_latitude,
            center_longitude,
        }
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, DEFAULT_CAMERA_DISTANCE],
            target: [0.0, 0.0, 0.0],
            zoom: DEFAULT_CAMERA_DISTANCE,
            center_latitude: 0.0,
            center_longitude: 0.0,
        }
    }
}

/// Host-facing snapshot of one globe. `Default` is the shape reported for
/// unknown, uninitialized and disposed globes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobeInstanceState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub globe_id: Option<String>,
    pub is_initialized: bool,
    pub is_auto_rotating: bool,
    pub current_level_of_detail: u8,
    pub participant_count: usize,
    pub country_count: usize,
    pub camera: CameraState,
    pub frames_per_second: f64,
}
