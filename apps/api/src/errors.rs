use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::evaluation::batch::FileFailure;
use crate::evaluation::BatchError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Every file in the batch failed; carries the per-file reasons.
    #[error("No résumé could be processed")]
    NothingProcessed(Vec<FileFailure>),

    #[error("AI service error: {0}")]
    AiService(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<BatchError> for AppError {
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::Upload(e) => AppError::Validation(e.to_string()),
            BatchError::JobExtraction(e) => AppError::AiService(e.to_string()),
            BatchError::JobPosting(e) => AppError::Store(e),
            BatchError::NothingProcessed { failures, .. } => AppError::NothingProcessed(failures),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
            ),
            AppError::NothingProcessed(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_RESUME_PROCESSED",
                "None of the uploaded résumés could be processed".to_string(),
            ),
            AppError::AiService(msg) => {
                tracing::error!("AI service error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI_SERVICE_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
        };

        let mut body = json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        });
        if let AppError::NothingProcessed(failures) = &self {
            body["errors"] = json!(failures);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::upload::UploadError;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_nothing_processed_is_422_with_reasons() {
        let err = AppError::from(BatchError::NothingProcessed {
            job_posting_id: uuid::Uuid::nil(),
            failures: vec![FileFailure {
                file: "a.pdf".to_string(),
                error: "PDF contains no extractable text".to_string(),
            }],
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NO_RESUME_PROCESSED");
        assert_eq!(body["errors"][0]["file"], "a.pdf");
    }

    #[tokio::test]
    async fn test_upload_error_is_400() {
        let err = AppError::from(BatchError::Upload(UploadError::NoFiles));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_ai_error_message_is_generic() {
        let response = AppError::AiService("upstream said: key=abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "AI_SERVICE_ERROR");
        assert!(!body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("key=abc"));
    }

    #[tokio::test]
    async fn test_store_error_is_generic_500() {
        let response =
            AppError::from(StoreError::UnknownJobPosting(uuid::Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert_eq!(body["error"]["message"], "A database error occurred");
    }
}
