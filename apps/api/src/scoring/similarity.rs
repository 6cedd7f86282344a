//! Similarity backends: pluggable, trait-based.
//!
//! Default: `EmbeddingScorer` (Gemini embeddings + cosine).
//! Offline: `LexicalScorer` (term-frequency cosine, deterministic, no network).
//!
//! `AppState` holds an `Arc<dyn SimilarityScorer>`, chosen at startup via
//! `SIMILARITY_BACKEND`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::llm_client::{LlmClient, LlmError, ModelInfo};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "the", "of", "in", "on", "for", "to", "with", "at", "by", "or", "is", "as",
    "de", "des", "du", "et", "la", "le", "les", "en", "un", "une", "pour", "avec",
];

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Embedding service error: {0}")]
    Embedding(#[from] LlmError),

    #[error("Similarity model is unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding dimensions don't match: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    #[error("Similarity is not a finite number")]
    NonFinite,
}

/// Health snapshot of a scorer backend.
#[derive(Debug, Clone, Serialize)]
pub struct ScorerStatus {
    pub backend: &'static str,
    pub model: String,
    pub configured: bool,
    pub loaded: bool,
}

impl ScorerStatus {
    pub fn ready(backend: &'static str, model: &str) -> Self {
        Self {
            backend,
            model: model.to_string(),
            configured: true,
            loaded: true,
        }
    }
}

/// Returns a similarity in [-1, 1] for two non-empty texts.
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, ScoringError>;

    fn status(&self) -> ScorerStatus;
}

// ────────────────────────────────────────────────────────────────────────────
// LexicalScorer
// ────────────────────────────────────────────────────────────────────────────

/// Cosine similarity over lowercase term frequencies. Always in [0, 1].
pub struct LexicalScorer;

#[async_trait]
impl SimilarityScorer for LexicalScorer {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, ScoringError> {
        Ok(term_cosine(&term_frequencies(a), &term_frequencies(b)))
    }

    fn status(&self) -> ScorerStatus {
        ScorerStatus::ready("lexical", "term-frequency")
    }
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in text
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .map(str::to_lowercase)
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
    {
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}

fn term_cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// EmbeddingScorer
// ────────────────────────────────────────────────────────────────────────────

/// Embedding-based scorer. The model is resolved once, on first use, and the
/// handle is shared by every request afterwards.
pub struct EmbeddingScorer {
    llm: LlmClient,
    model: String,
    handle: OnceCell<ModelInfo>,
}

impl EmbeddingScorer {
    pub fn new(llm: LlmClient, model: String) -> Self {
        Self {
            llm,
            model,
            handle: OnceCell::new(),
        }
    }

    /// Resolves the model; concurrent first callers wait on the same init.
    async fn ensure_loaded(&self) -> Result<&ModelInfo, ScoringError> {
        self.handle
            .get_or_try_init(|| async {
                let info = self
                    .llm
                    .model_info(&self.model)
                    .await
                    .map_err(|e| ScoringError::ModelUnavailable(e.to_string()))?;
                info!(
                    "Similarity model loaded: {} ({})",
                    info.name, info.display_name
                );
                Ok::<_, ScoringError>(info)
            })
            .await
    }
}

#[async_trait]
impl SimilarityScorer for EmbeddingScorer {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, ScoringError> {
        self.ensure_loaded().await?;
        let vectors = self.llm.embed(&self.model, &[a, b]).await?;
        match vectors.as_slice() {
            [va, vb] => cosine_similarity(va, vb),
            other => Err(ScoringError::ModelUnavailable(format!(
                "expected 2 embeddings, got {}",
                other.len()
            ))),
        }
    }

    fn status(&self) -> ScorerStatus {
        ScorerStatus {
            backend: "embedding",
            model: self.model.clone(),
            configured: self.llm.is_configured(),
            loaded: self.handle.initialized(),
        }
    }
}

/// Cosine similarity of two embedding vectors. Zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, ScoringError> {
    if a.len() != b.len() {
        return Err(ScoringError::DimensionMismatch(a.len(), b.len()));
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}
