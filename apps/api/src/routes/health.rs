use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::graph::GraphStore;
use crate::state::AppState;

/// GET /health
/// Liveness plus readiness detail: graph connectivity, ML load state, and
/// artifact presence. Reports configuration shape only, never secrets.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let graph_connected = GraphStore::new(state.db.clone()).ping().await.is_ok();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "skillcompass-api",
        "ml": {
            "ready": state.ml.ready(),
            "model": state.config.embedding_model_id,
            "index_present": state.config.index_path.exists(),
            "mapping_present": state.config.index_mapping_path.exists(),
        },
        "graph": {
            "connected": graph_connected,
        },
    }))
}
