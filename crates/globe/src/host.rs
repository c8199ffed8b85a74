//! Community registration flow on top of the mediator.
//!
//! The repository is the source of truth. The globe mirrors it, so a globe
//! failure after a successful write is logged and the write still counts.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::GlobeError;
use crate::geocoding::{GeocodeError, Geocoder};
use crate::mediator::GlobeMediator;
use crate::options::GlobeOptions;
use crate::repository::{Participant, ParticipantRepository, RepositoryError};
use crate::results::{GlobeInstanceState, InitResult};
use crate::validation::check_registration;

#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    Invalid(GlobeError),
    Geocode(GeocodeError),
    Repository(RepositoryError),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::Invalid(err) => write!(f, "invalid registration: {err}"),
            HostError::Geocode(err) => write!(f, "address lookup failed: {err}"),
            HostError::Repository(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for HostError {}

impl From<GlobeError> for HostError {
    fn from(err: GlobeError) -> Self {
        HostError::Invalid(err)
    }
}

impl From<GeocodeError> for HostError {
    fn from(err: GeocodeError) -> Self {
        HostError::Geocode(err)
    }
}

impl From<RepositoryError> for HostError {
    fn from(err: RepositoryError) -> Self {
        HostError::Repository(err)
    }
}

/// Drives one globe container from participant storage.
pub struct CommunityHost {
    repository: Arc<dyn ParticipantRepository>,
    geocoder: Arc<dyn Geocoder>,
    mediator: Arc<GlobeMediator>,
    container_id: String,
    cancel: CancellationToken,
}

impl CommunityHost {
    pub fn new(
        repository: Arc<dyn ParticipantRepository>,
        geocoder: Arc<dyn Geocoder>,
        mediator: Arc<GlobeMediator>,
        container_id: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            geocoder,
            mediator,
            container_id: container_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn mediator(&self) -> &Arc<GlobeMediator> {
        &self.mediator
    }

    /// Initializes the globe and loads every stored participant onto it.
    pub async fn start(&self, options: GlobeOptions) -> Result<InitResult, HostError> {
        let init = self
            .mediator
            .initialize(&self.container_id, options, &self.cancel)
            .await;
        if !init.success {
            warn!(
                container_id = %self.container_id,
                error = init.error_message.as_deref().unwrap_or("unknown"),
                "globe unavailable, continuing without it"
            );
        }
        self.reload().await?;
        Ok(init)
    }

    /// Validates, geocodes and stores a new participant, then shows it.
    pub async fn register(&self, name: &str, address: &str) -> Result<Participant, HostError> {
        check_registration(name, address)?;
        let place = self.geocoder.geocode(address).await?;
        let participant = Participant::new(
            name.trim(),
            place.formatted_address,
            place.latitude,
            place.longitude,
        );
        self.repository.add(participant.clone()).await?;

        let shown = self
            .mediator
            .add_participant(&self.container_id, participant.to_point(), &self.cancel)
            .await;
        if !shown.success {
            warn!(
                container_id = %self.container_id,
                participant_id = %participant.id,
                error = shown.error_message.as_deref().unwrap_or("unknown"),
                "participant stored but not shown on globe"
            );
        }
        info!(container_id = %self.container_id, participant_id = %participant.id, "participant registered");
        Ok(participant)
    }

    /// Replaces the globe's points with the repository contents.
    pub async fn reload(&self) -> Result<usize, HostError> {
        let participants = self.repository.list_all().await?;
        let points = participants.iter().map(Participant::to_point).collect();
        let shown = self
            .mediator
            .add_participants(&self.container_id, points, &self.cancel)
            .await;
        if !shown.success {
            warn!(
                container_id = %self.container_id,
                error = shown.error_message.as_deref().unwrap_or("unknown"),
                "globe reload failed"
            );
        }
        Ok(participants.len())
    }

    /// Deletes a participant. `Ok(false)` when nothing was stored under `id`.
    pub async fn unregister(&self, id: &str) -> Result<bool, HostError> {
        if !self.repository.delete(id).await? {
            return Ok(false);
        }
        let hidden = self
            .mediator
            .remove_participant(&self.container_id, id, &self.cancel)
            .await;
        if !hidden.success {
            warn!(
                container_id = %self.container_id,
                participant_id = %id,
                error = hidden.error_message.as_deref().unwrap_or("unknown"),
                "participant deleted but still on globe"
            );
        }
        Ok(true)
    }

    pub async fn state(&self) -> GlobeInstanceState {
        self.mediator.get_state(&self.container_id).await
    }

    /// Cancels in-flight globe work and disposes the container. Consumes the
    /// host, since its cancellation token is spent afterwards.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.mediator.dispose(&self.container_id, &self.cancel).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediatorConfig;
    use crate::geocoding::StaticGeocoder;
    use crate::headless::HeadlessBackend;
    use crate::repository::InMemoryParticipantRepository;

    fn host_with(backend: HeadlessBackend) -> (CommunityHost, Arc<InMemoryParticipantRepository>) {
        let repository = Arc::new(InMemoryParticipantRepository::new());
        let geocoder = StaticGeocoder::new()
            .with_entry("Moscow", 55.7558, 37.6173)
            .with_entry("Paris", 48.8566, 2.3522);
        let mediator = GlobeMediator::new(Arc::new(backend), MediatorConfig::default());
        let host = CommunityHost::new(
            repository.clone(),
            Arc::new(geocoder),
            Arc::new(mediator),
            "community",
        );
        (host, repository)
    }

    #[tokio::test(start_paused = true)]
    async fn register_persists_and_shows() {
        let (host, repository) = host_with(HeadlessBackend::new());
        assert!(host.start(GlobeOptions::default()).await.unwrap().success);

        let alice = host.register("Alice", "moscow").await.unwrap();
        assert_eq!(alice.location, "Moscow");
        assert_eq!(repository.len(), 1);
        assert_eq!(host.state().await.participant_count, 1);

        assert!(host.unregister(&alice.id).await.unwrap());
        assert!(!host.unregister(&alice.id).await.unwrap());
        assert_eq!(host.state().await.participant_count, 0);

        let mediator = host.mediator().clone();
        host.shutdown().await;
        assert!(!mediator.get_state("community").await.is_initialized);
        assert!(mediator.container_ids().is_empty());
    }

    #[tokio::test]
    async fn rejected_registrations_store_nothing() {
        let (host, repository) = host_with(HeadlessBackend::new());
        assert!(matches!(
            host.register("A", "Moscow").await,
            Err(HostError::Invalid(GlobeError::Validation { .. }))
        ));
        assert!(matches!(
            host.register("Alice", "Atlantis").await,
            Err(HostError::Geocode(GeocodeError::NotFound(_)))
        ));
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn globe_failure_does_not_undo_storage() {
        // Never started, so the globe rejects every command.
        let (host, repository) = host_with(HeadlessBackend::new());
        let bob = host.register("Bob", "Paris").await.unwrap();
        assert_eq!(repository.len(), 1);
        assert!(host.unregister(&bob.id).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn start_loads_existing_participants() {
        let stored = vec![
            Participant::new("Alice", "Moscow", 55.75, 37.61),
            Participant::new("Bob", "Paris", 48.85, 2.35),
        ];
        let repository = Arc::new(InMemoryParticipantRepository::with_participants(stored));
        let mediator = GlobeMediator::new(Arc::new(HeadlessBackend::new()), MediatorConfig::default());
        let host = CommunityHost::new(
            repository,
            Arc::new(StaticGeocoder::new()),
            Arc::new(mediator),
            "community",
        );

        assert!(host.start(GlobeOptions::default()).await.unwrap().success);
        assert_eq!(host.state().await.participant_count, 2);
        host.shutdown().await;
    }

    #[tokio::test]
    async fn unavailable_backend_still_registers() {
        let (host, repository) = host_with(HeadlessBackend::new().unsupported());
        let init = host.start(GlobeOptions::default()).await.unwrap();
        assert!(!init.success);
        host.register("Alice", "Moscow").await.unwrap();
        assert_eq!(repository.len(), 1);
    }
}
