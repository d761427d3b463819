//! Autocomplete/dropdown listings backing the selection UI.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::graph::models::{CatalogEntry, GroupEntry};
use crate::graph::GraphStore;
use crate::routes::occupations::clamp_limit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/v1/catalog/occupations
pub async fn handle_occupations(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let limit = clamp_limit(params.limit)?;
    let entries = GraphStore::new(state.db.clone())
        .occupations_autocomplete(params.q.as_deref(), limit)
        .await?;
    Ok(Json(entries))
}

/// GET /api/v1/catalog/skills
pub async fn handle_skills(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let limit = clamp_limit(params.limit)?;
    let entries = GraphStore::new(state.db.clone())
        .skills_autocomplete(params.q.as_deref(), limit)
        .await?;
    Ok(Json(entries))
}

/// GET /api/v1/catalog/occupation-groups
pub async fn handle_occupation_groups(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> Result<Json<Vec<GroupEntry>>, AppError> {
    let limit = clamp_limit(params.limit)?;
    let entries = GraphStore::new(state.db.clone())
        .occupation_groups(params.q.as_deref(), limit)
        .await?;
    Ok(Json(entries))
}

/// GET /api/v1/catalog/skill-groups
pub async fn handle_skill_groups(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let limit = clamp_limit(params.limit)?;
    let entries = GraphStore::new(state.db.clone())
        .skill_groups(params.q.as_deref(), limit)
        .await?;
    Ok(Json(entries))
}

/// GET /api/v1/catalog/schemes
pub async fn handle_schemes(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let entries = GraphStore::new(state.db.clone()).concept_schemes().await?;
    Ok(Json(entries))
}
