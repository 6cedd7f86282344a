//! Axum route handlers for the Evaluation API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::batch::{BatchOutcome, FileFailure, RankedCandidate};
use crate::evaluation::upload::ResumeUpload;
use crate::models::evaluation::EvaluationSummary;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub success: bool,
    pub job_id: Uuid,
    pub count: usize,
    pub top_ranked: Vec<RankedCandidate>,
    /// `null` when every file succeeded.
    pub errors: Option<Vec<FileFailure>>,
}

impl From<BatchOutcome> for EvaluateResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            success: true,
            job_id: outcome.job_posting.id,
            count: outcome.ranked.len(),
            top_ranked: outcome.ranked,
            errors: (!outcome.failures.is_empty()).then_some(outcome.failures),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationListResponse {
    pub success: bool,
    pub count: usize,
    pub evaluations: Vec<EvaluationSummary>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/evaluate
///
/// Multipart form: one `job_description` text field and one or more
/// `resumes` file fields. Other fields are ignored.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EvaluateResponse>, AppError> {
    let mut job_description: Option<String> = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "job_description" => {
                job_description = Some(field.text().await.map_err(multipart_error)?);
            }
            "resumes" => {
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let content = field.bytes().await.map_err(multipart_error)?;
                uploads.push(ResumeUpload { filename, content });
            }
            _ => {}
        }
    }

    let job_description = job_description
        .ok_or_else(|| AppError::Validation("Missing job_description field".to_string()))?;

    let outcome = state.evaluator.evaluate(&job_description, uploads).await?;
    Ok(Json(EvaluateResponse::from(outcome)))
}

/// GET /api/v1/evaluations
///
/// Every stored evaluation, newest first.
pub async fn handle_list_evaluations(
    State(state): State<AppState>,
) -> Result<Json<EvaluationListResponse>, AppError> {
    let evaluations = state.store.list_evaluations().await?;
    Ok(Json(EvaluationListResponse {
        success: true,
        count: evaluations.len(),
        evaluations,
    }))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}
