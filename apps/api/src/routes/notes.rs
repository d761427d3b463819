//! Free-form notes attached to occupations (career-advisor annotations).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::graph::models::NoteRow;
use crate::graph::GraphStore;
use crate::routes::occupations::clamp_limit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    pub occupation_uri: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotesListResponse {
    pub total: i64,
    pub notes: Vec<NoteRow>,
}

/// GET /api/v1/notes
pub async fn handle_list_notes(
    State(state): State<AppState>,
    Query(params): Query<NotesQuery>,
) -> Result<Json<NotesListResponse>, AppError> {
    let limit = clamp_limit(params.limit)?;
    let (total, notes) = GraphStore::new(state.db.clone())
        .list_notes(
            params.occupation_uri.as_deref(),
            limit,
            params.offset.unwrap_or(0).max(0),
        )
        .await?;

    Ok(Json(NotesListResponse { total, notes }))
}

#[derive(Debug, Deserialize)]
pub struct UpsertNoteRequest {
    pub occupation_uri: String,
    /// Omit to create a new note; supply to update an existing one.
    pub note_id: Option<Uuid>,
    pub text: String,
}

/// PUT /api/v1/notes
pub async fn handle_upsert_note(
    State(state): State<AppState>,
    Json(req): Json<UpsertNoteRequest>,
) -> Result<Json<NoteRow>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("Note text must not be empty".to_string()));
    }

    let note = GraphStore::new(state.db.clone())
        .upsert_note(&req.occupation_uri, req.note_id, &req.text)
        .await?;

    note.map(Json).ok_or_else(|| {
        AppError::NotFound(format!("Occupation {} not found", req.occupation_uri))
    })
}

/// DELETE /api/v1/notes/:id
pub async fn handle_delete_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = GraphStore::new(state.db.clone()).delete_note(id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Note {id} not found")))
    }
}
