use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A person, keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One extraction of a candidate's résumé.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRecordRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub source_filename: String,
    pub raw_text: String,
    pub skills_text: String,
    pub experience: String,
    pub created_at: DateTime<Utc>,
}
