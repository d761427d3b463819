use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::graph::models::SkillRow;
use crate::graph::store::{GraphStore, SkillSearch};
use crate::routes::occupations::{clamp_limit, split_uris};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SkillQuery {
    pub q: Option<String>,
    pub skill_type: Option<String>,
    pub groups: Option<String>,
    pub schemes: Option<String>,
    /// Restrict to skills related to this skill URI.
    pub related_to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SkillListResponse {
    pub total: usize,
    pub skills: Vec<SkillRow>,
}

/// GET /api/v1/skills
pub async fn handle_search_skills(
    State(state): State<AppState>,
    Query(params): Query<SkillQuery>,
) -> Result<Json<SkillListResponse>, AppError> {
    let limit = clamp_limit(params.limit)?;
    let search = SkillSearch {
        q: params.q,
        skill_type: params.skill_type,
        groups: split_uris(params.groups.as_deref()),
        schemes: split_uris(params.schemes.as_deref()),
        related_to: params.related_to,
        limit,
        offset: params.offset.unwrap_or(0).max(0),
    };

    let skills = GraphStore::new(state.db.clone())
        .search_skills(&search)
        .await?;

    Ok(Json(SkillListResponse {
        total: skills.len(),
        skills,
    }))
}
