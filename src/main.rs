use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use i18n_detector::document::InMemoryDocumentTree;
use i18n_detector::i18n::AdapterRegistry;
use i18n_detector::session::InMemorySessionStore;
use i18n_detector::zone::ZoneRegistry;
use i18n_detector::{server, Config, Detector, DetectorState, EventBus};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("i18n_detector=info".parse()?),
        )
        .init();

    info!("Starting i18n detector");

    let config = Config::from_env()?;

    let zones = match &config.zones_file {
        Some(path) => ZoneRegistry::from_file(path)?,
        None => {
            warn!("I18N_ZONES_FILE not set, serving the default zone only");
            ZoneRegistry::default()
        }
    };

    let documents = match &config.documents_file {
        Some(path) => InMemoryDocumentTree::from_file(path)?,
        None => {
            warn!("I18N_DOCUMENTS_FILE not set, no document will be resolved");
            InMemoryDocumentTree::new()
        }
    };

    // Log every context switch; listeners of other concerns subscribe the same way
    let bus = EventBus::default();
    let mut events = bus.subscribe();

    let sessions = InMemorySessionStore::with_limits(
        config.session_capacity,
        chrono::Duration::minutes(config.session_ttl_minutes),
    );

    let detector = Detector::builder(zones, AdapterRegistry::with_defaults(&config))
        .event_bus(bus)
        .session_store(Arc::new(sessions))
        .trailing_slash(config.allow_trailing_slash)
        .execution_mode(config.execution_mode)
        .build()
        .context("Invalid detector wiring")?;

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(
                    "Context switch ({}) triggered by {}",
                    event.switched_dimensions().join(", "),
                    event.triggered_by
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Context switch listener lagged, {} event(s) skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let state = DetectorState::new(detector, documents, config.country_header.clone());
    let app = server::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
