use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::graph::models::CountEntry;
use crate::graph::GraphStore;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CountsResponse {
    pub nodes: Vec<CountEntry>,
    pub relationships: Vec<CountEntry>,
}

/// GET /api/v1/diagnostics/counts
/// Node and relationship tallies, for verifying an ETL load.
pub async fn handle_counts(
    State(state): State<AppState>,
) -> Result<Json<CountsResponse>, AppError> {
    let store = GraphStore::new(state.db.clone());
    let nodes = store.node_counts().await?;
    let relationships = store.edge_counts().await?;
    Ok(Json(CountsResponse {
        nodes,
        relationships,
    }))
}
