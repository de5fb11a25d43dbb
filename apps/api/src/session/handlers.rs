use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::experience::ExperienceRecord;
use crate::session::SessionPhase;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub has_credential: bool,
    pub created_at: DateTime<Utc>,
    /// Empty until a credential is set; the store is hidden behind it.
    pub experiences: Vec<ExperienceRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveExperienceQuery {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct AddExperienceRequest {
    pub title: String,
    pub description: String,
    pub date_range: String,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let session_id = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionCreatedResponse { session_id }))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state.sessions.get(id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionResponse {
        session_id: session.id,
        phase: session.phase(),
        has_credential: session.has_credential(),
        created_at: session.created_at,
        experiences: session
            .experiences()
            .map(|records| records.to_vec())
            .unwrap_or_default(),
    }))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.end(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/credential
pub async fn handle_set_credential(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CredentialRequest>,
) -> Result<StatusCode, AppError> {
    let handle = state.sessions.get(id).await?;
    handle.lock().await.set_credential(&req.api_key)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/:id/experiences
pub async fn handle_list_experiences(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ExperienceRecord>>, AppError> {
    let handle = state.sessions.get(id).await?;
    let session = handle.lock().await;
    Ok(Json(session.experiences()?.to_vec()))
}

/// POST /api/v1/sessions/:id/experiences
///
/// Adding an existing title replaces that record.
pub async fn handle_add_experience(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddExperienceRequest>,
) -> Result<(StatusCode, Json<Vec<ExperienceRecord>>), AppError> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;
    session.add_experience(&req.title, &req.description, &req.date_range)?;
    Ok((StatusCode::CREATED, Json(session.experiences()?.to_vec())))
}

/// DELETE /api/v1/sessions/:id/experiences?title=...
///
/// The title travels in the query string: as a path segment, titles such as
/// `..` would be normalized away by the browser.
pub async fn handle_remove_experience(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<RemoveExperienceQuery>,
) -> Result<Json<Vec<ExperienceRecord>>, AppError> {
    let handle = state.sessions.get(id).await?;
    let mut session = handle.lock().await;
    session.remove_experience(&query.title)?;
    Ok(Json(session.experiences()?.to_vec()))
}
