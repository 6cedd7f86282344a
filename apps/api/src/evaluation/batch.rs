//! Batch evaluation: one job description against many résumés.
//!
//! The job description is extracted once and stored as a job posting. Each
//! file then goes through read → extract → score → persist on its own; a
//! failure is recorded against that file and the batch moves on. Successes
//! are ranked by score, highest first, ties keeping upload order.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::evaluation::document::{read_document, DocumentError, DocumentReader};
use crate::evaluation::upload::{ResumeUpload, UploadError, UploadLimits};
use crate::extraction::models::JobExtraction;
use crate::extraction::{ExtractionError, Extractor};
use crate::models::evaluation::JobPostingRow;
use crate::scoring::{explanation, similarity_score, ScoringError, SimilarityScorer};
use crate::store::{
    EvaluationSubmission, NewCandidate, NewJobPosting, NewResume, Store, StoreError,
};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// One successfully evaluated résumé, as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    #[serde(rename = "candidat_id")]
    pub candidate_id: Uuid,
    #[serde(rename = "cv_id")]
    pub resume_id: Uuid,
    pub evaluation_id: Uuid,
    pub filename: String,
    #[serde(rename = "nom")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    pub job_title: String,
    #[serde(rename = "score_sur_100")]
    pub score: f64,
    #[serde(rename = "competences")]
    pub skills: Vec<String>,
    #[serde(rename = "resume_experience")]
    pub experience_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub job_posting: JobPostingRow,
    pub ranked: Vec<RankedCandidate>,
    pub failures: Vec<FileFailure>,
}

/// Why a single file was dropped from the batch.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Request-level failures. Anything here aborts the whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Job description extraction failed: {0}")]
    JobExtraction(ExtractionError),

    #[error("Could not store job posting: {0}")]
    JobPosting(StoreError),

    #[error("No résumé could be processed ({} failed)", failures.len())]
    NothingProcessed {
        job_posting_id: Uuid,
        failures: Vec<FileFailure>,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// BatchEvaluator
// ────────────────────────────────────────────────────────────────────────────

pub struct BatchEvaluator {
    extractor: Arc<dyn Extractor>,
    scorer: Arc<dyn SimilarityScorer>,
    reader: Arc<dyn DocumentReader>,
    store: Arc<dyn Store>,
    limits: UploadLimits,
}

impl BatchEvaluator {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        scorer: Arc<dyn SimilarityScorer>,
        reader: Arc<dyn DocumentReader>,
        store: Arc<dyn Store>,
        limits: UploadLimits,
    ) -> Self {
        Self {
            extractor,
            scorer,
            reader,
            store,
            limits,
        }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub async fn evaluate(
        &self,
        job_description: &str,
        uploads: Vec<ResumeUpload>,
    ) -> Result<BatchOutcome, BatchError> {
        let job_description = self.limits.check_job_description(job_description)?;
        self.limits.check_batch_size(uploads.len())?;

        let job = self
            .extractor
            .extract_job(&job_description)
            .await
            .map_err(BatchError::JobExtraction)?;
        let job_posting = self
            .store
            .create_job_posting(&NewJobPosting::from_extraction(&job_description, &job))
            .await
            .map_err(BatchError::JobPosting)?;
        let job_text = job.job_text(&job_description);

        info!(
            "Evaluating {} résumé(s) against job posting {} ({})",
            uploads.len(),
            job_posting.id,
            job_posting.title
        );

        let mut ranked = Vec::with_capacity(uploads.len());
        let mut failures = Vec::new();

        for upload in &uploads {
            match self
                .evaluate_file(upload, &job, &job_text, job_posting.id)
                .await
            {
                Ok(candidate) => {
                    info!(
                        "{}: scored {:.2} ({})",
                        upload.filename, candidate.score, candidate.email
                    );
                    ranked.push(candidate);
                }
                Err(e) => {
                    warn!("{}: skipped: {e}", upload.filename);
                    failures.push(FileFailure {
                        file: upload.filename.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if ranked.is_empty() {
            return Err(BatchError::NothingProcessed {
                job_posting_id: job_posting.id,
                failures,
            });
        }

        rank(&mut ranked);
        info!(
            "Batch for job posting {} done: {} ranked, {} failed",
            job_posting.id,
            ranked.len(),
            failures.len()
        );

        Ok(BatchOutcome {
            job_posting,
            ranked,
            failures,
        })
    }

    async fn evaluate_file(
        &self,
        upload: &ResumeUpload,
        job: &JobExtraction,
        job_text: &str,
        job_posting_id: Uuid,
    ) -> Result<RankedCandidate, FileError> {
        self.limits.check_file(upload)?;

        let text = read_document(self.reader.clone(), upload.content.clone()).await?;
        let extraction = self.extractor.extract_resume(&text).await?;
        let candidate = NewCandidate::from_identity(&extraction.identity)?;

        let score =
            similarity_score(self.scorer.as_ref(), &extraction.profile_text(), job_text).await?;
        let explanation = explanation(
            score,
            self.scorer.status().backend,
            &extraction.skills,
            &job.required_skills,
        );

        let recorded = self
            .store
            .record_evaluation(&EvaluationSubmission {
                candidate,
                resume: NewResume::from_extraction(&upload.filename, &text, &extraction),
                job_posting_id,
                score,
                explanation,
            })
            .await?;

        Ok(RankedCandidate {
            candidate_id: recorded.candidate.id,
            resume_id: recorded.resume.id,
            evaluation_id: recorded.evaluation.id,
            filename: upload.filename.clone(),
            name: recorded.candidate.name,
            email: recorded.candidate.email,
            phone: recorded.candidate.phone,
            job_title: extraction.job_title,
            score,
            skills: extraction.skills,
            experience_summary: extraction.experience_summary,
        })
    }
}

/// Highest score first. `sort_by` is stable, so equal scores keep upload order.
pub fn rank(candidates: &mut [RankedCandidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::extraction::models::{Contact, Identity, ResumeExtraction};
    use crate::llm_client::repair::MalformedAiOutput;
    use crate::llm_client::LlmError;
    use crate::scoring::similarity::LexicalScorer;
    use crate::store::MemoryStore;

    /// Treats the bytes after the `%PDF-` header as the document text.
    struct PlainTextReader;

    impl DocumentReader for PlainTextReader {
        fn read_text(&self, content: &[u8]) -> Result<String, DocumentError> {
            let text = String::from_utf8_lossy(content);
            let text = text.trim_start_matches("%PDF-").trim();
            if text.is_empty() {
                return Err(DocumentError::NoText);
            }
            Ok(text.to_string())
        }
    }

    /// Résumé extractions keyed by document text; unknown text is malformed output.
    struct FakeExtractor {
        resumes: HashMap<String, ResumeExtraction>,
        job: Option<JobExtraction>,
        job_calls: AtomicUsize,
    }

    #[async_trait]
    impl Extractor for FakeExtractor {
        async fn extract_resume(
            &self,
            document_text: &str,
        ) -> Result<ResumeExtraction, ExtractionError> {
            self.resumes.get(document_text).cloned().ok_or_else(|| {
                ExtractionError::Malformed(MalformedAiOutput::NoObject {
                    cleaned: document_text.to_string(),
                })
            })
        }

        async fn extract_job(&self, _: &str) -> Result<JobExtraction, ExtractionError> {
            self.job_calls.fetch_add(1, Ordering::SeqCst);
            self.job
                .clone()
                .ok_or(ExtractionError::Service(LlmError::Timeout))
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    const JOB_DESCRIPTION: &str = "Senior backend engineer, Go and Kubernetes";

    fn backend_job() -> JobExtraction {
        JobExtraction {
            job_title: "Senior Backend Engineer".to_string(),
            required_skills: vec!["Go".to_string(), "Kubernetes".to_string()],
        }
    }

    fn resume(name: &str, email: &str, skills: &[&str], summary: &str) -> ResumeExtraction {
        ResumeExtraction {
            identity: Identity {
                name: name.to_string(),
                contact: Contact {
                    email: email.to_string(),
                    phone: String::new(),
                    address: String::new(),
                },
            },
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_summary: summary.to_string(),
            job_title: String::new(),
        }
    }

    fn go_engineer() -> ResumeExtraction {
        resume(
            "Ada",
            "ada@example.com",
            &["Go", "Docker"],
            "Five years running backend services on Kubernetes",
        )
    }

    fn designer() -> ResumeExtraction {
        resume(
            "Grace",
            "grace@example.com",
            &["Photoshop", "Illustrator"],
            "Brand identity and print design for fashion labels",
        )
    }

    fn upload(filename: &str, text: &str) -> ResumeUpload {
        ResumeUpload {
            filename: filename.to_string(),
            content: Bytes::from(format!("%PDF-{text}")),
        }
    }

    fn evaluator(
        resumes: Vec<(&str, ResumeExtraction)>,
        limits: UploadLimits,
    ) -> (BatchEvaluator, Arc<FakeExtractor>, Arc<MemoryStore>) {
        let extractor = Arc::new(FakeExtractor {
            resumes: resumes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            job: Some(backend_job()),
            job_calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryStore::new());
        let evaluator = BatchEvaluator::new(
            extractor.clone(),
            Arc::new(LexicalScorer),
            Arc::new(PlainTextReader),
            store.clone(),
            limits,
        );
        (evaluator, extractor, store)
    }

    #[tokio::test]
    async fn test_one_bad_file_does_not_sink_the_batch() {
        let (evaluator, _, store) = evaluator(
            vec![("designer", designer()), ("go", go_engineer())],
            UploadLimits::default(),
        );

        let outcome = evaluator
            .evaluate(
                JOB_DESCRIPTION,
                vec![
                    upload("designer.pdf", "designer"),
                    upload("broken.pdf", "garbled"),
                    upload("go.pdf", "go"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcome.ranked.len(), 2);
        assert_eq!(outcome.ranked[0].filename, "go.pdf");
        assert_eq!(outcome.ranked[1].filename, "designer.pdf");
        assert!(outcome.ranked[0].score > outcome.ranked[1].score);

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].file, "broken.pdf");
        assert!(outcome.failures[0].error.contains("Malformed AI output"));

        assert_eq!(store.list_evaluations().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_backend_resume_outranks_designer() {
        let (evaluator, _, _) = evaluator(
            vec![("designer", designer()), ("go", go_engineer())],
            UploadLimits::default(),
        );

        let outcome = evaluator
            .evaluate(
                JOB_DESCRIPTION,
                vec![upload("b.pdf", "designer"), upload("a.pdf", "go")],
            )
            .await
            .unwrap();

        let top = &outcome.ranked[0];
        assert_eq!(top.email, "ada@example.com");
        assert_eq!(top.name, "Ada");
        assert!(top.score > outcome.ranked[1].score);
        assert!((0.0..=100.0).contains(&top.score));
        assert_eq!(outcome.job_posting.title, "Senior Backend Engineer");
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_processed_reports_every_file() {
        let limits = UploadLimits {
            max_file_bytes: 64,
            ..UploadLimits::default()
        };
        let (evaluator, _, _) = evaluator(vec![], limits);

        let err = evaluator
            .evaluate(
                JOB_DESCRIPTION,
                vec![
                    upload("notes.txt", "hello"),
                    upload("huge.pdf", &"x".repeat(100)),
                    upload("unknown.pdf", "nobody"),
                ],
            )
            .await
            .unwrap_err();

        match err {
            BatchError::NothingProcessed { failures, .. } => {
                let files: Vec<&str> = failures.iter().map(|f| f.file.as_str()).collect();
                assert_eq!(files, ["notes.txt", "huge.pdf", "unknown.pdf"]);
                assert!(failures[0].error.contains(".pdf extension"));
                assert!(failures[1].error.contains("exceeds maximum"));
                assert!(failures[2].error.contains("Malformed AI output"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_email_fails_only_that_file() {
        let (evaluator, _, _) = evaluator(
            vec![
                ("anon", resume("Anon", "", &["Go"], "Go developer")),
                ("go", go_engineer()),
            ],
            UploadLimits::default(),
        );

        let outcome = evaluator
            .evaluate(
                JOB_DESCRIPTION,
                vec![upload("anon.pdf", "anon"), upload("go.pdf", "go")],
            )
            .await
            .unwrap();

        assert_eq!(outcome.ranked.len(), 1);
        assert_eq!(
            outcome.failures,
            vec![FileFailure {
                file: "anon.pdf".to_string(),
                error: "Missing identity field: email".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_too_many_files_rejects_before_any_ai_call() {
        let limits = UploadLimits {
            max_files: 2,
            ..UploadLimits::default()
        };
        let (evaluator, extractor, _) = evaluator(vec![("go", go_engineer())], limits);

        let err = evaluator
            .evaluate(
                JOB_DESCRIPTION,
                vec![upload("1.pdf", "go"), upload("2.pdf", "go"), upload("3.pdf", "go")],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BatchError::Upload(UploadError::TooManyFiles { count: 3, max: 2 })
        ));
        assert_eq!(extractor.job_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_job_description_is_rejected() {
        let (evaluator, extractor, _) = evaluator(vec![], UploadLimits::default());
        let err = evaluator
            .evaluate("Go", vec![upload("go.pdf", "go")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::Upload(UploadError::JobDescriptionTooShort(10))
        ));
        assert_eq!(extractor.job_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_job_extraction_failure_aborts_batch() {
        let store = Arc::new(MemoryStore::new());
        let evaluator = BatchEvaluator::new(
            Arc::new(FakeExtractor {
                resumes: HashMap::new(),
                job: None,
                job_calls: AtomicUsize::new(0),
            }),
            Arc::new(LexicalScorer),
            Arc::new(PlainTextReader),
            store.clone(),
            UploadLimits::default(),
        );

        let err = evaluator
            .evaluate(JOB_DESCRIPTION, vec![upload("go.pdf", "go")])
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::JobExtraction(_)));
        assert!(store.list_evaluations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_resume_twice_reuses_records() {
        let (evaluator, _, store) = evaluator(vec![("go", go_engineer())], UploadLimits::default());

        let outcome = evaluator
            .evaluate(
                JOB_DESCRIPTION,
                vec![upload("go.pdf", "go"), upload("go-copy.pdf", "go")],
            )
            .await
            .unwrap();

        assert_eq!(outcome.ranked.len(), 2);
        assert_eq!(outcome.ranked[0].candidate_id, outcome.ranked[1].candidate_id);
        assert_eq!(outcome.ranked[0].resume_id, outcome.ranked[1].resume_id);
        assert_eq!(
            outcome.ranked[0].evaluation_id,
            outcome.ranked[1].evaluation_id
        );
        // Equal scores keep upload order.
        assert_eq!(outcome.ranked[0].filename, "go.pdf");
        assert_eq!(store.list_evaluations().await.unwrap().len(), 1);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let make = |file: &str, score: f64| RankedCandidate {
            candidate_id: Uuid::nil(),
            resume_id: Uuid::nil(),
            evaluation_id: Uuid::nil(),
            filename: file.to_string(),
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            job_title: String::new(),
            score,
            skills: vec![],
            experience_summary: String::new(),
        };
        let mut ranked = vec![make("a", 50.0), make("b", 80.0), make("c", 50.0), make("d", 80.0)];
        rank(&mut ranked);
        let order: Vec<&str> = ranked.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(order, ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_ranked_candidate_serializes_with_public_keys() {
        let candidate = RankedCandidate {
            candidate_id: Uuid::nil(),
            resume_id: Uuid::nil(),
            evaluation_id: Uuid::nil(),
            filename: "cv.pdf".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: String::new(),
            job_title: "Engineer".to_string(),
            score: 81.25,
            skills: vec!["Go".to_string()],
            experience_summary: "Backend".to_string(),
        };
        let value = serde_json::to_value(&candidate).unwrap();
        assert_eq!(value["score_sur_100"], 81.25);
        assert_eq!(value["nom"], "Ada");
        assert_eq!(value["competences"][0], "Go");
        assert!(value.get("candidat_id").is_some());
        assert!(value.get("cv_id").is_some());
    }
}
