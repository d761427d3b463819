use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::ml::MlHandle;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Write-once ML context (embedding model + vector index). Set by the
    /// background load task at startup; handlers must treat an unset handle
    /// as a retryable not-ready condition.
    pub ml: Arc<MlHandle>,
    pub config: Config,
}
