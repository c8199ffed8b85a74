use scene::point_cloud::ParticipantPoint;
use serde::Serialize;

use crate::results::GlobeInstanceState;

/// Notifications a globe pushes to its subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GlobeEvent {
    Ready {
        container_id: String,
        globe_id: String,
    },
    Error {
        container_id: String,
        message: String,
    },
    ParticipantSelected {
        container_id: String,
        participant: ParticipantPoint,
    },
    StateChanged {
        container_id: String,
        state: GlobeInstanceState,
    },
}

impl GlobeEvent {
    pub fn container_id(&self) -> &str {
        match self {
            GlobeEvent::Ready { container_id, .. }
            | GlobeEvent::Error { container_id, .. }
            | GlobeEvent::ParticipantSelected { container_id, .. }
            | GlobeEvent::StateChanged { container_id, .. } => container_id,
        }
    }
}
