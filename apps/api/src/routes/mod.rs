pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.evaluator.limits().max_request_bytes();

    Router::new()
        .route("/health", get(health::health_handler))
        // Evaluation API
        .route(
            "/api/v1/evaluate",
            post(handlers::handle_evaluate).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/v1/evaluations", get(handlers::handle_list_evaluations))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::{Config, SimilarityBackend};
    use crate::evaluation::{BatchEvaluator, PdfTextReader};
    use crate::extraction::{Extractor, GeminiExtractor};
    use crate::llm_client::LlmClient;
    use crate::scoring::similarity::{EmbeddingScorer, LexicalScorer};
    use crate::scoring::SimilarityScorer;
    use crate::store::{MemoryStore, Store};

    const BOUNDARY: &str = "ats-test-boundary";

    fn config() -> Config {
        Config {
            database_url: None,
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_embedding_model: "text-embedding-004".to_string(),
            similarity_backend: SimilarityBackend::Lexical,
            max_files: 2,
            max_file_size_mb: 1,
            ai_timeout: Duration::from_secs(5),
            job_description_min_chars: 10,
            job_description_max_chars: 10_000,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    /// State with no Gemini key: every AI call fails fast without network.
    fn state_with(scorer: Arc<dyn SimilarityScorer>) -> AppState {
        let config = config();
        let llm = LlmClient::new(None, config.gemini_model.clone(), config.ai_timeout).unwrap();
        let extractor: Arc<dyn Extractor> = Arc::new(GeminiExtractor::new(llm));
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let evaluator = Arc::new(BatchEvaluator::new(
            extractor.clone(),
            scorer.clone(),
            Arc::new(PdfTextReader),
            store.clone(),
            config.upload_limits(),
        ));
        AppState {
            config,
            store,
            extractor,
            scorer,
            evaluator,
        }
    }

    fn multipart_body(job_description: Option<&str>, files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(text) = job_description {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_description\"\r\n\r\n{text}\r\n"
                )
                .as_bytes(),
            );
        }
        for (filename, content) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resumes\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_evaluate(state: AppState, body: Vec<u8>) -> (StatusCode, Value) {
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/evaluate")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let response = build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_is_degraded_without_gemini_key() {
        let (status, body) = get_json(state_with(Arc::new(LexicalScorer)), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["gemini_configured"], false);
        assert_eq!(body["similarity"]["backend"], "lexical");
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_health_reports_unloaded_embedding_model() {
        let llm = LlmClient::new(None, "m".to_string(), Duration::from_secs(1)).unwrap();
        let scorer = Arc::new(EmbeddingScorer::new(llm, "text-embedding-004".to_string()));
        let (_, body) = get_json(state_with(scorer), "/health").await;
        assert_eq!(body["similarity"]["backend"], "embedding");
        assert_eq!(body["similarity"]["configured"], false);
        assert_eq!(body["similarity"]["loaded"], false);
    }

    #[tokio::test]
    async fn test_missing_job_description_is_400() {
        let pdf: &[u8] = b"%PDF-1.4";
        let body = multipart_body(None, &[("cv.pdf", pdf)]);
        let (status, json) = post_evaluate(state_with(Arc::new(LexicalScorer)), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_resumes_is_400() {
        let body = multipart_body(Some("Senior backend engineer, Go and Kubernetes"), &[]);
        let (status, json) = post_evaluate(state_with(Arc::new(LexicalScorer)), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Missing resumes"));
    }

    #[tokio::test]
    async fn test_too_many_files_is_400() {
        let pdf: &[u8] = b"%PDF-1.4";
        let body = multipart_body(
            Some("Senior backend engineer, Go and Kubernetes"),
            &[("a.pdf", pdf), ("b.pdf", pdf), ("c.pdf", pdf)],
        );
        let (status, json) = post_evaluate(state_with(Arc::new(LexicalScorer)), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Too many resumes"));
    }

    #[tokio::test]
    async fn test_job_extraction_failure_is_generic_500() {
        let pdf: &[u8] = b"%PDF-1.4";
        let body = multipart_body(
            Some("Senior backend engineer, Go and Kubernetes"),
            &[("cv.pdf", pdf)],
        );
        let (status, json) = post_evaluate(state_with(Arc::new(LexicalScorer)), body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "AI_SERVICE_ERROR");
        assert_eq!(json["error"]["message"], "An AI processing error occurred");
    }

    #[tokio::test]
    async fn test_list_evaluations_starts_empty() {
        let (status, body) =
            get_json(state_with(Arc::new(LexicalScorer)), "/api/v1/evaluations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert_eq!(body["evaluations"], Value::Array(vec![]));
    }
}
