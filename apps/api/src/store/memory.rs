//! In-process store. Used when no database is configured; contents are lost
//! on restart.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::candidate::{CandidateRow, ResumeRecordRow};
use crate::models::evaluation::{EvaluationRow, EvaluationSummary, JobPostingRow};
use crate::store::{
    merge_contact, EvaluationSubmission, NewCandidate, NewJobPosting, NewResume,
    RecordedEvaluation, Store, StoreError,
};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    candidates: Vec<CandidateRow>,
    resumes: Vec<ResumeRecordRow>,
    job_postings: Vec<JobPostingRow>,
    evaluations: Vec<EvaluationRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn upsert_candidate(&mut self, candidate: &NewCandidate) -> CandidateRow {
        if let Some(existing) = self
            .candidates
            .iter_mut()
            .find(|c| c.email == candidate.email)
        {
            merge_contact(existing, candidate);
            existing.updated_at = Utc::now();
            return existing.clone();
        }

        let now = Utc::now();
        let row = CandidateRow {
            id: Uuid::new_v4(),
            name: candidate.name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            address: candidate.address.clone(),
            created_at: now,
            updated_at: now,
        };
        self.candidates.push(row.clone());
        row
    }

    fn find_or_create_resume(&mut self, candidate_id: Uuid, resume: &NewResume) -> ResumeRecordRow {
        if let Some(existing) = self.resumes.iter().find(|r| {
            r.candidate_id == candidate_id
                && r.skills_text == resume.skills_text
                && r.experience == resume.experience
        }) {
            return existing.clone();
        }

        let row = ResumeRecordRow {
            id: Uuid::new_v4(),
            candidate_id,
            source_filename: resume.source_filename.clone(),
            raw_text: resume.raw_text.clone(),
            skills_text: resume.skills_text.clone(),
            experience: resume.experience.clone(),
            created_at: Utc::now(),
        };
        self.resumes.push(row.clone());
        row
    }

    fn upsert_evaluation(
        &mut self,
        resume_id: Uuid,
        job_posting_id: Uuid,
        score: f64,
        explanation: &str,
    ) -> EvaluationRow {
        if let Some(existing) = self
            .evaluations
            .iter_mut()
            .find(|e| e.resume_id == resume_id && e.job_posting_id == job_posting_id)
        {
            existing.score = score;
            existing.explanation = explanation.to_string();
            return existing.clone();
        }

        let row = EvaluationRow {
            id: Uuid::new_v4(),
            resume_id,
            job_posting_id,
            score,
            explanation: explanation.to_string(),
            created_at: Utc::now(),
        };
        self.evaluations.push(row.clone());
        row
    }

    fn summarize(&self, evaluation: &EvaluationRow) -> Option<EvaluationSummary> {
        let resume = self.resumes.iter().find(|r| r.id == evaluation.resume_id)?;
        let candidate = self
            .candidates
            .iter()
            .find(|c| c.id == resume.candidate_id)?;
        let job = self
            .job_postings
            .iter()
            .find(|j| j.id == evaluation.job_posting_id)?;

        Some(EvaluationSummary {
            evaluation_id: evaluation.id,
            score: evaluation.score,
            explanation: evaluation.explanation.clone(),
            created_at: evaluation.created_at,
            resume_id: resume.id,
            source_filename: resume.source_filename.clone(),
            candidate_id: candidate.id,
            candidate_name: candidate.name.clone(),
            candidate_email: candidate.email.clone(),
            job_posting_id: job.id,
            job_title: job.title.clone(),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_job_posting(&self, job: &NewJobPosting) -> Result<JobPostingRow, StoreError> {
        let row = JobPostingRow {
            id: Uuid::new_v4(),
            title: job.title.clone(),
            description: job.description.clone(),
            required_skills_text: job.required_skills_text.clone(),
            created_at: Utc::now(),
        };
        self.inner.lock().await.job_postings.push(row.clone());
        Ok(row)
    }

    async fn record_evaluation(
        &self,
        submission: &EvaluationSubmission,
    ) -> Result<RecordedEvaluation, StoreError> {
        // One lock for the whole unit; validate before the first write.
        let mut tables = self.inner.lock().await;
        if !tables
            .job_postings
            .iter()
            .any(|j| j.id == submission.job_posting_id)
        {
            return Err(StoreError::UnknownJobPosting(submission.job_posting_id));
        }

        let candidate = tables.upsert_candidate(&submission.candidate);
        let resume = tables.find_or_create_resume(candidate.id, &submission.resume);
        let evaluation = tables.upsert_evaluation(
            resume.id,
            submission.job_posting_id,
            submission.score,
            &submission.explanation,
        );

        Ok(RecordedEvaluation {
            candidate,
            resume,
            evaluation,
        })
    }

    async fn list_evaluations(&self) -> Result<Vec<EvaluationSummary>, StoreError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .evaluations
            .iter()
            .rev()
            .filter_map(|e| tables.summarize(e))
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
