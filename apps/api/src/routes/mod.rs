pub mod catalog;
pub mod diagnostics;
pub mod health;
pub mod notes;
pub mod occupations;
pub mod skills;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::recommend::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Recommendation engine
        .route(
            "/api/v1/recommendations",
            post(handlers::handle_recommend),
        )
        // Taxonomy browsing
        .route(
            "/api/v1/occupations",
            get(occupations::handle_search_occupations),
        )
        .route(
            "/api/v1/occupations/:uri/skill-profile",
            get(occupations::handle_skill_profile),
        )
        .route("/api/v1/skills", get(skills::handle_search_skills))
        // Catalog (autocomplete/dropdowns)
        .route("/api/v1/catalog/occupations", get(catalog::handle_occupations))
        .route("/api/v1/catalog/skills", get(catalog::handle_skills))
        .route(
            "/api/v1/catalog/occupation-groups",
            get(catalog::handle_occupation_groups),
        )
        .route(
            "/api/v1/catalog/skill-groups",
            get(catalog::handle_skill_groups),
        )
        .route("/api/v1/catalog/schemes", get(catalog::handle_schemes))
        // Notes
        .route(
            "/api/v1/notes",
            get(notes::handle_list_notes).put(notes::handle_upsert_note),
        )
        .route("/api/v1/notes/:id", delete(notes::handle_delete_note))
        // Diagnostics
        .route(
            "/api/v1/diagnostics/counts",
            get(diagnostics::handle_counts),
        )
        .with_state(state)
}
