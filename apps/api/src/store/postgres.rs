use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::candidate::{CandidateRow, ResumeRecordRow};
use crate::models::evaluation::{EvaluationRow, EvaluationSummary, JobPostingRow};
use crate::store::{
    EvaluationSubmission, NewCandidate, NewJobPosting, NewResume, RecordedEvaluation, Store,
    StoreError,
};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Empty incoming values keep the stored ones (`NULLIF` + `COALESCE`).
async fn upsert_candidate(
    conn: &mut PgConnection,
    candidate: &NewCandidate,
) -> Result<CandidateRow, sqlx::Error> {
    sqlx::query_as::<_, CandidateRow>(
        r#"
        INSERT INTO candidates (id, name, email, phone, address)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET
            name       = COALESCE(NULLIF(EXCLUDED.name, ''), candidates.name),
            phone      = COALESCE(NULLIF(EXCLUDED.phone, ''), candidates.phone),
            address    = COALESCE(NULLIF(EXCLUDED.address, ''), candidates.address),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&candidate.name)
    .bind(&candidate.email)
    .bind(&candidate.phone)
    .bind(&candidate.address)
    .fetch_one(&mut *conn)
    .await
}

async fn find_resume(
    conn: &mut PgConnection,
    candidate_id: Uuid,
    resume: &NewResume,
) -> Result<Option<ResumeRecordRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRecordRow>(
        r#"
        SELECT * FROM resume_records
        WHERE candidate_id = $1 AND skills_text = $2 AND experience = $3
        LIMIT 1
        "#,
    )
    .bind(candidate_id)
    .bind(&resume.skills_text)
    .bind(&resume.experience)
    .fetch_optional(&mut *conn)
    .await
}

async fn find_or_create_resume(
    conn: &mut PgConnection,
    candidate_id: Uuid,
    resume: &NewResume,
) -> Result<ResumeRecordRow, sqlx::Error> {
    if let Some(existing) = find_resume(conn, candidate_id, resume).await? {
        return Ok(existing);
    }

    let inserted = sqlx::query_as::<_, ResumeRecordRow>(
        r#"
        INSERT INTO resume_records
            (id, candidate_id, source_filename, raw_text, skills_text, experience)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (candidate_id, (md5(skills_text)), (md5(experience))) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind(&resume.source_filename)
    .bind(&resume.raw_text)
    .bind(&resume.skills_text)
    .bind(&resume.experience)
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(row) => Ok(row),
        // Lost a race with a concurrent insert of the same résumé.
        None => find_resume(conn, candidate_id, resume)
            .await?
            .ok_or(sqlx::Error::RowNotFound),
    }
}

async fn upsert_evaluation(
    conn: &mut PgConnection,
    resume_id: Uuid,
    job_posting_id: Uuid,
    score: f64,
    explanation: &str,
) -> Result<EvaluationRow, sqlx::Error> {
    sqlx::query_as::<_, EvaluationRow>(
        r#"
        INSERT INTO evaluations (id, resume_id, job_posting_id, score, explanation)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (resume_id, job_posting_id) DO UPDATE SET
            score       = EXCLUDED.score,
            explanation = EXCLUDED.explanation
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(resume_id)
    .bind(job_posting_id)
    .bind(score)
    .bind(explanation)
    .fetch_one(&mut *conn)
    .await
}

#[async_trait]
impl Store for PgStore {
    async fn create_job_posting(&self, job: &NewJobPosting) -> Result<JobPostingRow, StoreError> {
        let row = sqlx::query_as::<_, JobPostingRow>(
            r#"
            INSERT INTO job_postings (id, title, description, required_skills_text)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.required_skills_text)
        .fetch_one(&self.pool)
        .await?;

        info!("Created job posting {} ({})", row.id, row.title);
        Ok(row)
    }

    async fn record_evaluation(
        &self,
        submission: &EvaluationSubmission,
    ) -> Result<RecordedEvaluation, StoreError> {
        // Dropping the transaction on any error rolls the whole unit back.
        let mut tx = self.pool.begin().await?;

        let candidate = upsert_candidate(&mut *tx, &submission.candidate).await?;
        let resume = find_or_create_resume(&mut *tx, candidate.id, &submission.resume).await?;
        let evaluation = upsert_evaluation(
            &mut *tx,
            resume.id,
            submission.job_posting_id,
            submission.score,
            &submission.explanation,
        )
        .await?;

        tx.commit().await?;

        Ok(RecordedEvaluation {
            candidate,
            resume,
            evaluation,
        })
    }

    async fn list_evaluations(&self) -> Result<Vec<EvaluationSummary>, StoreError> {
        Ok(sqlx::query_as::<_, EvaluationSummary>(
            r#"
            SELECT
                e.id            AS evaluation_id,
                e.score,
                e.explanation,
                e.created_at,
                r.id            AS resume_id,
                r.source_filename,
                c.id            AS candidate_id,
                c.name          AS candidate_name,
                c.email         AS candidate_email,
                j.id            AS job_posting_id,
                j.title         AS job_title
            FROM evaluations e
            JOIN resume_records r ON r.id = e.resume_id
            JOIN candidates c     ON c.id = r.candidate_id
            JOIN job_postings j   ON j.id = e.job_posting_id
            ORDER BY e.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
