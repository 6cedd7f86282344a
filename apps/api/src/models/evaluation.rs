use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills_text: String,
    pub created_at: DateTime<Utc>,
}

/// A scored (résumé, job posting) pair. Unique per pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub job_posting_id: Uuid,
    pub score: f64,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
}

/// An evaluation joined with its candidate, résumé and job posting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationSummary {
    pub evaluation_id: Uuid,
    pub score: f64,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
    pub resume_id: Uuid,
    pub source_filename: String,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub job_posting_id: Uuid,
    pub job_title: String,
}
