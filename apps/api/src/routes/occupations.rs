use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::graph::models::{OccupationRow, RequiredSkill};
use crate::graph::store::{GraphStore, OccupationSearch};
use crate::state::AppState;

/// Query parameters for occupation search. Multi-value filters are
/// comma-separated URI lists.
#[derive(Debug, Deserialize)]
pub struct OccupationQuery {
    pub q: Option<String>,
    pub groups: Option<String>,
    pub skills: Option<String>,
    pub schemes: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OccupationListResponse {
    pub total: usize,
    pub occupations: Vec<OccupationRow>,
}

/// GET /api/v1/occupations
pub async fn handle_search_occupations(
    State(state): State<AppState>,
    Query(params): Query<OccupationQuery>,
) -> Result<Json<OccupationListResponse>, AppError> {
    let limit = clamp_limit(params.limit)?;
    let search = OccupationSearch {
        q: params.q,
        groups: split_uris(params.groups.as_deref()),
        required_skills: split_uris(params.skills.as_deref()),
        schemes: split_uris(params.schemes.as_deref()),
        limit,
        offset: params.offset.unwrap_or(0).max(0),
    };

    let occupations = GraphStore::new(state.db.clone())
        .search_occupations(&search)
        .await?;

    Ok(Json(OccupationListResponse {
        total: occupations.len(),
        occupations,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SkillProfileQuery {
    #[serde(default)]
    pub essential_only: bool,
    pub skill_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SkillProfileResponse {
    pub occupation_uri: String,
    pub occupation_label: String,
    pub isco_code: Option<String>,
    pub essential_skills: Vec<RequiredSkill>,
    pub optional_skills: Vec<RequiredSkill>,
}

/// GET /api/v1/occupations/:uri/skill-profile
///
/// The occupation URI travels percent-encoded in the path segment.
pub async fn handle_skill_profile(
    State(state): State<AppState>,
    Path(uri): Path<String>,
    Query(params): Query<SkillProfileQuery>,
) -> Result<Json<SkillProfileResponse>, AppError> {
    let result = GraphStore::new(state.db.clone())
        .occupation_required_skills(&uri, params.essential_only, params.skill_type.as_deref())
        .await?;

    let Some((occupation, skills)) = result else {
        return Err(AppError::NotFound(format!("Occupation {uri} not found")));
    };

    let (essential_skills, optional_skills): (Vec<RequiredSkill>, Vec<RequiredSkill>) = skills
        .into_iter()
        .partition(|s| s.relation_type.to_lowercase().contains("essential"));

    Ok(Json(SkillProfileResponse {
        occupation_uri: occupation.uri,
        occupation_label: occupation.label,
        isco_code: occupation.isco_code,
        essential_skills,
        optional_skills,
    }))
}

/// Splits a comma-separated URI list, dropping blanks.
pub fn split_uris(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Listing endpoints share the recommendation limit bounds.
pub fn clamp_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(20);
    if !(1..=100).contains(&limit) {
        return Err(AppError::Validation(
            "limit must be between 1 and 100".to_string(),
        ));
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_uris_handles_commas_and_blanks() {
        assert_eq!(
            split_uris(Some("a, b,,c ")),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(split_uris(Some("")).is_empty());
        assert!(split_uris(None).is_empty());
    }

    #[test]
    fn test_clamp_limit_bounds() {
        assert_eq!(clamp_limit(None).unwrap(), 20);
        assert_eq!(clamp_limit(Some(100)).unwrap(), 100);
        assert!(clamp_limit(Some(0)).is_err());
        assert!(clamp_limit(Some(101)).is_err());
    }
}
