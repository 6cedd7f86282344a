//! Persistence: candidates, résumés, job postings and evaluations.
//!
//! `Store` is carried in `AppState` as `Arc<dyn Store>`. `PgStore` is the
//! production backend; `MemoryStore` is used when no `DATABASE_URL` is set.
//!
//! Rules shared by every backend:
//! - candidates are keyed by email (trimmed, lowercased); an empty email is
//!   `MissingIdentityField`, never a placeholder
//! - on a repeat sighting only non-empty contact fields overwrite stored ones
//! - a résumé with the same (candidate, skills text, experience) is reused
//! - job postings are never deduplicated
//! - an evaluation is unique per (résumé, job posting); re-scoring updates it
//! - `record_evaluation` writes candidate + résumé + evaluation atomically

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::extraction::models::{Identity, JobExtraction, ResumeExtraction};
use crate::models::candidate::{CandidateRow, ResumeRecordRow};
use crate::models::evaluation::{EvaluationRow, EvaluationSummary, JobPostingRow};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing identity field: {0}")]
    MissingIdentityField(&'static str),

    #[error("Job posting {0} does not exist")]
    UnknownJobPosting(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Identity fields for get-or-create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl NewCandidate {
    pub fn from_identity(identity: &Identity) -> Result<Self, StoreError> {
        let email = identity.contact.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(StoreError::MissingIdentityField("email"));
        }
        Ok(Self {
            name: identity.name.trim().to_string(),
            email,
            phone: identity.contact.phone.trim().to_string(),
            address: identity.contact.address.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewResume {
    pub source_filename: String,
    pub raw_text: String,
    pub skills_text: String,
    pub experience: String,
}

impl NewResume {
    pub fn from_extraction(
        source_filename: &str,
        raw_text: &str,
        extraction: &ResumeExtraction,
    ) -> Self {
        Self {
            source_filename: source_filename.to_string(),
            raw_text: raw_text.to_string(),
            skills_text: extraction.skills_text(),
            experience: extraction.experience_summary.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewJobPosting {
    pub title: String,
    pub description: String,
    pub required_skills_text: String,
}

impl NewJobPosting {
    pub fn from_extraction(description: &str, extraction: &JobExtraction) -> Self {
        Self {
            title: extraction.job_title.clone(),
            description: description.to_string(),
            required_skills_text: extraction.required_skills_text(),
        }
    }
}

/// Everything written for one successfully scored file.
#[derive(Debug, Clone)]
pub struct EvaluationSubmission {
    pub candidate: NewCandidate,
    pub resume: NewResume,
    pub job_posting_id: Uuid,
    pub score: f64,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct RecordedEvaluation {
    pub candidate: CandidateRow,
    pub resume: ResumeRecordRow,
    pub evaluation: EvaluationRow,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_job_posting(&self, job: &NewJobPosting) -> Result<JobPostingRow, StoreError>;

    /// One atomic unit: get-or-create the candidate by email (merging
    /// contact fields), find-or-create the résumé by its dedup key, then
    /// upsert the evaluation for (résumé, job posting).
    async fn record_evaluation(
        &self,
        submission: &EvaluationSubmission,
    ) -> Result<RecordedEvaluation, StoreError>;

    /// All evaluations, newest first.
    async fn list_evaluations(&self) -> Result<Vec<EvaluationSummary>, StoreError>;

    fn backend(&self) -> &'static str;
}

/// Overwrites stored contact fields with the non-empty incoming ones.
pub fn merge_contact(existing: &mut CandidateRow, incoming: &NewCandidate) {
    for (stored, new) in [
        (&mut existing.name, &incoming.name),
        (&mut existing.phone, &incoming.phone),
        (&mut existing.address, &incoming.address),
    ] {
        if !new.is_empty() {
            stored.clone_from(new);
        }
    }
}
