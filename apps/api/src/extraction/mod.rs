//! Extraction: turns résumé text and job descriptions into structured records.
//!
//! `Extractor` is the seam the batch evaluator depends on. `GeminiExtractor`
//! is the production backend; all model output goes through the tolerant JSON
//! repair pipeline inside `LlmClient::generate_json`.

pub mod models;
pub mod prompts;

use async_trait::async_trait;
use thiserror::Error;

use crate::extraction::models::{JobExtraction, ResumeExtraction};
use crate::extraction::prompts::{
    EXTRACTION_SYSTEM, JOB_EXTRACT_PROMPT_TEMPLATE, RESUME_EXTRACT_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{EXTRACT_ONLY_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::repair::MalformedAiOutput;
use crate::llm_client::{LlmClient, LlmError};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("AI service error: {0}")]
    Service(LlmError),

    #[error("Malformed AI output: {0}")]
    Malformed(MalformedAiOutput),
}

impl From<LlmError> for ExtractionError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Malformed(m) => ExtractionError::Malformed(m),
            other => ExtractionError::Service(other),
        }
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract_resume(&self, document_text: &str)
        -> Result<ResumeExtraction, ExtractionError>;

    async fn extract_job(&self, job_description: &str) -> Result<JobExtraction, ExtractionError>;

    /// Whether the backend has the credentials it needs.
    fn is_configured(&self) -> bool;
}

pub struct GeminiExtractor {
    llm: LlmClient,
}

impl GeminiExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    fn system_prompt() -> String {
        format!("{EXTRACTION_SYSTEM} {JSON_ONLY_SYSTEM} {EXTRACT_ONLY_INSTRUCTION}")
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract_resume(
        &self,
        document_text: &str,
    ) -> Result<ResumeExtraction, ExtractionError> {
        let prompt = RESUME_EXTRACT_PROMPT_TEMPLATE.replace("{document_text}", document_text);
        Ok(self
            .llm
            .generate_json::<ResumeExtraction>(&prompt, &Self::system_prompt())
            .await?)
    }

    async fn extract_job(&self, job_description: &str) -> Result<JobExtraction, ExtractionError> {
        let prompt = JOB_EXTRACT_PROMPT_TEMPLATE.replace("{job_description}", job_description);
        Ok(self
            .llm
            .generate_json::<JobExtraction>(&prompt, &Self::system_prompt())
            .await?)
    }

    fn is_configured(&self) -> bool {
        self.llm.is_configured()
    }
}

/// Strips NUL and control characters (keeping newline, tab and carriage
/// return) before text is placed in a prompt.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}
