//! Axum route handlers for the analysis run and artifact downloads.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::orchestrator::{run_analysis, AnalysisResult, Artifact, TEXT_PLAIN};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct Download {
    pub artifact: Artifact,
    pub label: &'static str,
    pub filename: &'static str,
    pub mime: &'static str,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub run_id: Uuid,
    pub initial_evaluation: String,
    pub optimized_cv: String,
    pub final_evaluation: String,
    pub failed_steps: Vec<Artifact>,
    pub completed_at: DateTime<Utc>,
    pub downloads: Vec<Download>,
}

impl AnalysisResponse {
    fn new(session_id: Uuid, result: AnalysisResult) -> Self {
        let downloads = Artifact::DOWNLOADS
            .into_iter()
            .map(|artifact| Download {
                artifact,
                label: artifact.label(),
                filename: artifact.filename(),
                mime: TEXT_PLAIN,
                url: format!(
                    "/api/v1/sessions/{session_id}/artifacts/{}",
                    artifact.filename()
                ),
            })
            .collect();

        Self {
            run_id: result.run_id,
            initial_evaluation: result.initial_evaluation,
            optimized_cv: result.optimized_cv,
            final_evaluation: result.final_evaluation,
            failed_steps: result.failed_steps,
            completed_at: result.completed_at,
            downloads,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/:id/analysis
///
/// Validates, then runs evaluate → optimize → evaluate. Provider failures do not
/// fail the request: they come back as text in the affected artifacts.
pub async fn handle_run_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let handle = state.sessions.get(id).await?;
    let input = handle.lock().await.begin_run(&request.job_description)?;
    info!("Session {id}: analysis started");

    // Spawned so a dropped client connection cannot cancel a started run
    let llm = state.llm.clone();
    let session = handle.clone();
    let outcome = tokio::spawn(async move {
        let result = run_analysis(llm.as_ref(), &input).await;
        session.lock().await.complete_run(result.clone());
        result
    })
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            warn!("Session {id}: analysis task failed: {e}");
            handle.lock().await.abort_run();
            return Err(AppError::Internal(anyhow::anyhow!(
                "Analysis task failed: {e}"
            )));
        }
    };

    Ok(Json(AnalysisResponse::new(id, result)))
}

/// GET /api/v1/sessions/:id/artifacts/:filename
///
/// Serves one artifact of the last completed run as a plain-text download.
pub async fn handle_download_artifact(
    State(state): State<AppState>,
    Path((id, filename)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let artifact = Artifact::from_filename(&filename)
        .ok_or_else(|| AppError::NotFound(format!("Unknown artifact '{filename}'")))?;

    let handle = state.sessions.get(id).await?;
    let session = handle.lock().await;
    let body = session
        .last_run()
        .map(|run| run.artifact(artifact).to_string())
        .ok_or_else(|| AppError::NotFound("No completed analysis in this session".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, format!("{TEXT_PLAIN}; charset=utf-8")),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.filename()),
            ),
        ],
        body,
    ))
}
