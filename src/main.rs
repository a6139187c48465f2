//! Fleet Tally - passenger counting and fare tally for an intercity bus fleet
//!
//! The conductor logs boardings and alightings on a single live trip; closed
//! trips are stored and summarized for the fleet administrator.

mod alerts;
mod api;
mod catalog;
mod config;
mod dashboard;
mod insights;
mod llm;
mod runtime;
mod session;
mod store;

use alerts::MockAlertFeed;
use api::{create_router, AppState};
use catalog::Catalog;
use config::AppConfig;
use insights::LlmSummarizer;
use llm::ModelRegistry;
use runtime::{ConductorRuntime, FixedLocation};
use session::TripContext;
use std::net::SocketAddr;
use std::sync::Arc;
use store::Database;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_tally=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;
    tracing::info!(sessions = db.session_count()?, "Session store ready");

    // `fleet_tally export` dumps the stored sessions and exits
    if std::env::args().nth(1).as_deref() == Some("export") {
        println!("{}", db.export_json()?);
        return Ok(());
    }

    let catalog = match &config.catalog_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading catalog");
            Catalog::from_file(path)?
        }
        None => Catalog::builtin(),
    };
    let catalog = Arc::new(catalog);
    tracing::info!(
        routes = catalog.routes.len(),
        vehicles = catalog.vehicles.len(),
        turns = catalog.turns.len(),
        "Catalog loaded"
    );

    let registry = ModelRegistry::new(&config.llm);
    if registry.has_models() {
        tracing::info!(
            model = registry.default_model_id().unwrap_or_default(),
            "Insight model configured"
        );
    } else {
        tracing::warn!("No model configured. Set GEMINI_API_KEY or LLM_GATEWAY to enable insights.");
    }

    let runtime = ConductorRuntime::new(
        TripContext::new(catalog.clone()),
        Arc::new(db),
        Arc::new(FixedLocation::default()),
    );

    let state = AppState {
        runtime: Arc::new(runtime),
        catalog,
        summarizer: Arc::new(LlmSummarizer::new(registry.default_service())),
        alerts: Arc::new(MockAlertFeed),
        utc_offset: config.utc_offset,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Fleet Tally server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
