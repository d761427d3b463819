mod config;
mod db;
mod errors;
mod graph;
mod ml;
mod recommend;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::ml::{MlContext, MlHandle};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillCompass API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // ML resources (embedding model + vector index) load in the background;
    // requests that need them get a retryable not-ready response until the
    // handle is set. Artifact/dimension problems are fatal, not served around.
    let ml = Arc::new(MlHandle::new());
    spawn_ml_load(ml.clone(), config.clone());

    // Build app state
    let state = AppState {
        db,
        ml,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_ml_load(handle: Arc<MlHandle>, config: Config) {
    tokio::task::spawn_blocking(move || match MlContext::initialize(&config) {
        Ok(context) => handle.set(context),
        Err(e) => {
            error!("Failed to initialize ML resources: {e:?}");
            // Startup-fatal: a missing or mismatched artifact must abort
            // serving rather than answer every request with not-ready.
            std::process::exit(1);
        }
    });
}
