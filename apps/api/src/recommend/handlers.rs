use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::graph::{CandidateFilter, GraphStore};
use crate::recommend::engine::{Recommendation, RecommendationEngine};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    /// Skill URIs the user possesses.
    pub skills: Vec<String>,
    /// Optional occupation-group URIs to filter results.
    #[serde(default)]
    pub occupation_groups: Vec<String>,
    /// Optional concept-scheme URIs to filter results.
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub total: usize,
    pub user_skills: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

/// POST /api/v1/recommendations
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let ml = state
        .ml
        .get()
        .ok_or_else(|| AppError::NotReady("ML resources are still loading".to_string()))?;

    let store = GraphStore::new(state.db.clone());
    let engine = RecommendationEngine::new(ml, &store);
    let filter = CandidateFilter::new(req.occupation_groups, req.schemes);

    let recommendations = engine.recommend(&req.skills, &filter, req.limit).await?;

    Ok(Json(RecommendationResponse {
        total: recommendations.len(),
        user_skills: req.skills,
        recommendations,
    }))
}
