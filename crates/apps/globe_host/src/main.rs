use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use globe::geocoding::{GeocodedAddress, StaticGeocoder};
use globe::host::CommunityHost;
use globe::repository::{InMemoryParticipantRepository, Participant};
use globe::{GlobeEvent, GlobeMediator, GlobeOptions, HeadlessBackend, MediatorConfig};
use runtime::event_bus::Event;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless community globe host")]
struct Args {
    /// Container id the globe is mounted under
    #[arg(long, default_value = "community-globe")]
    container: String,

    /// JSON file with globe options (camelCase, every field optional)
    #[arg(long)]
    options: Option<String>,

    /// JSON file with stored participants
    #[arg(long)]
    participants: Option<String>,

    /// JSON file with extra gazetteer entries for address lookup
    #[arg(long)]
    gazetteer: Option<String>,

    /// Register a participant, as "Name=Address" (repeatable)
    #[arg(long = "register")]
    registrations: Vec<String>,

    /// Camera target: lat,lng
    #[arg(long)]
    center: Option<String>,

    /// Level of detail applied after startup (0-3)
    #[arg(long)]
    lod: Option<u8>,

    /// How long to run the render loop before reporting state
    #[arg(long, default_value_t = 2000)]
    run_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let options: GlobeOptions = match &args.options {
        Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        None => GlobeOptions::default(),
    };
    let stored: Vec<Participant> = match &args.participants {
        Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        None => Vec::new(),
    };
    let mut geocoder = default_gazetteer();
    if let Some(path) = &args.gazetteer {
        let extra: Vec<GeocodedAddress> =
            serde_json::from_str(&tokio::fs::read_to_string(path).await?)?;
        for entry in extra {
            geocoder = geocoder.with_entry(entry.formatted_address, entry.latitude, entry.longitude);
        }
    }

    let config = MediatorConfig::from_env();
    info!(?config, container = %args.container, "starting globe host");
    let mediator = Arc::new(GlobeMediator::new(Arc::new(HeadlessBackend::new()), config));
    let events = tokio::spawn(log_events(mediator.subscribe(&args.container)));

    let host = CommunityHost::new(
        Arc::new(InMemoryParticipantRepository::with_participants(stored)),
        Arc::new(geocoder),
        mediator.clone(),
        args.container.clone(),
    );

    let init = host.start(options).await?;
    if !init.success {
        error!(
            error = init.error_message.as_deref().unwrap_or("unknown"),
            "globe failed to initialize"
        );
    }

    for registration in &args.registrations {
        let Some((name, address)) = registration.split_once('=') else {
            warn!(%registration, "expected Name=Address");
            continue;
        };
        match host.register(name, address).await {
            Ok(participant) => info!(id = %participant.id, name = %participant.name, "registered"),
            Err(err) => warn!(%registration, error = %err, "registration rejected"),
        }
    }

    let cancel = CancellationToken::new();
    if let Some(lod) = args.lod {
        let result = mediator.set_level_of_detail(&args.container, lod, &cancel).await;
        info!(?result, "level of detail");
    }
    if let Some(center) = &args.center {
        let (lat, lng) = parse_lat_lng(center)?;
        let result = mediator.center_on(&args.container, lat, lng, None, &cancel).await;
        info!(?result, "center on");
    }

    tokio::time::sleep(Duration::from_millis(args.run_ms)).await;

    let state = host.state().await;
    println!("{}", serde_json::to_string_pretty(&state)?);

    host.shutdown().await;
    events.abort();
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<Event<GlobeEvent>>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event.payload) {
                Ok(json) => info!(frame = event.frame_index, event = %json, "globe event"),
                Err(err) => warn!(error = %err, "unserializable globe event"),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn default_gazetteer() -> StaticGeocoder {
    StaticGeocoder::new()
        .with_entry("Moscow", 55.7558, 37.6173)
        .with_entry("Saint Petersburg", 59.9343, 30.3351)
        .with_entry("London", 51.5074, -0.1278)
        .with_entry("Paris", 48.8566, 2.3522)
        .with_entry("New York", 40.7128, -74.0060)
        .with_entry("Tokyo", 35.6762, 139.6503)
        .with_entry("Sydney", -33.8688, 151.2093)
}

fn parse_lat_lng(raw: &str) -> Result<(f64, f64), Box<dyn std::error::Error>> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("center must be lat,lng, got '{raw}'"))?;
    Ok((lat.trim().parse()?, lng.trim().parse()?))
}
