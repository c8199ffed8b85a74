//! Participant persistence.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use scene::point_cloud::ParticipantPoint;
use serde::{Deserialize, Serialize};

use crate::backend::BoxFuture;

/// A registered community member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    /// Address as entered by the participant.
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Unix milliseconds.
    pub registered_at: u64,
}

impl Participant {
    /// New participant with a fresh id, registered now.
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        let registered_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            location: location.into(),
            latitude,
            longitude,
            registered_at,
        }
    }

    pub fn to_point(&self) -> ParticipantPoint {
        ParticipantPoint::new(self.id.clone(), self.name.clone(), self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    Duplicate(String),
    NotFound(String),
    Unavailable(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::Duplicate(id) => write!(f, "participant '{id}' already exists"),
            RepositoryError::NotFound(id) => write!(f, "participant '{id}' not found"),
            RepositoryError::Unavailable(msg) => write!(f, "participant storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

pub trait ParticipantRepository: Send + Sync {
    /// Stores `participant` and returns its id.
    fn add(&self, participant: Participant) -> BoxFuture<'_, Result<String, RepositoryError>>;

    fn list_all(&self) -> BoxFuture<'_, Result<Vec<Participant>, RepositoryError>>;

    fn get<'a>(&'a self, id: &'a str)
    -> BoxFuture<'a, Result<Option<Participant>, RepositoryError>>;

    fn update(&self, participant: Participant) -> BoxFuture<'_, Result<(), RepositoryError>>;

    /// `Ok(false)` when nothing was stored under `id`.
    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, RepositoryError>>;
}

/// Process-local repository keeping registration order.
#[derive(Debug, Default)]
pub struct InMemoryParticipantRepository {
    participants: RwLock<Vec<Participant>>,
}

impl InMemoryParticipantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_participants(participants: Vec<Participant>) -> Self {
        Self {
            participants: RwLock::new(participants),
        }
    }

    pub fn len(&self) -> usize {
        self.participants.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ParticipantRepository for InMemoryParticipantRepository {
    fn add(&self, participant: Participant) -> BoxFuture<'_, Result<String, RepositoryError>> {
        Box::pin(async move {
            let mut participants = self.participants.write();
            if participants.iter().any(|p| p.id == participant.id) {
                return Err(RepositoryError::Duplicate(participant.id));
            }
            let id = participant.id.clone();
            participants.push(participant);
            Ok(id)
        })
    }

    fn list_all(&self) -> BoxFuture<'_, Result<Vec<Participant>, RepositoryError>> {
        Box::pin(async move { Ok(self.participants.read().clone()) })
    }

    fn get<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Participant>, RepositoryError>> {
        Box::pin(async move { Ok(self.participants.read().iter().find(|p| p.id == id).cloned()) })
    }

    fn update(&self, participant: Participant) -> BoxFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            let mut participants = self.participants.write();
            let slot = participants
                .iter_mut()
                .find(|p| p.id == participant.id)
                .ok_or_else(|| RepositoryError::NotFound(participant.id.clone()))?;
            *slot = participant;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool, RepositoryError>> {
        Box::pin(async move {
            let mut participants = self.participants.write();
            let before = participants.len();
            participants.retain(|p| p.id != id);
            Ok(participants.len() != before)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryParticipantRepository, Participant, ParticipantRepository, RepositoryError};

    #[tokio::test]
    async fn add_rejects_duplicate_ids() {
        let repo = InMemoryParticipantRepository::new();
        let alice = Participant::new("Alice", "Moscow", 55.75, 37.61);
        let id = repo.add(alice.clone()).await.unwrap();
        assert_eq!(id, alice.id);
        assert_eq!(
            repo.add(alice.clone()).await,
            Err(RepositoryError::Duplicate(alice.id.clone()))
        );
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let repo = InMemoryParticipantRepository::new();
        let mut alice = Participant::new("Alice", "Moscow", 55.75, 37.61);
        repo.add(alice.clone()).await.unwrap();

        alice.location = "Paris".into();
        repo.update(alice.clone()).await.unwrap();
        assert_eq!(repo.get(&alice.id).await.unwrap().unwrap().location, "Paris");

        assert!(repo.delete(&alice.id).await.unwrap());
        assert!(!repo.delete(&alice.id).await.unwrap());
        assert!(repo.update(alice).await.is_err());
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[test]
    fn projects_to_point() {
        let alice = Participant::new("Alice", "Moscow", 55.75, 37.61);
        let point = alice.to_point();
        assert_eq!(point.id, alice.id);
        assert_eq!((point.latitude, point.longitude), (55.75, 37.61));
        assert!(alice.registered_at > 0);
    }
}
