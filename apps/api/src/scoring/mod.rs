//! Scoring: maps a bounded similarity into a 0–100 score.
//!
//! `similarity_score` is the only way the rest of the service turns two texts
//! into a score: it short-circuits empty text to a defined 0.0, asks the
//! injected `SimilarityScorer` otherwise, and normalizes the result.

pub mod similarity;

pub use similarity::{ScorerStatus, ScoringError, SimilarityScorer};

/// Maps a similarity in [-1, 1] to a percentage in [0, 100], rounded to two
/// decimals. Out-of-range input is clamped.
pub fn normalize(raw: f64) -> f64 {
    let pct = ((raw + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}

/// Normalized similarity between `a` and `b`.
///
/// Returns exactly 0.0 without calling `scorer` when either text is blank.
pub async fn similarity_score(
    scorer: &dyn SimilarityScorer,
    a: &str,
    b: &str,
) -> Result<f64, ScoringError> {
    if a.trim().is_empty() || b.trim().is_empty() {
        return Ok(0.0);
    }
    let raw = scorer.similarity(a, b).await?;
    if !raw.is_finite() {
        return Err(ScoringError::NonFinite);
    }
    Ok(normalize(raw))
}

/// Human-readable explanation stored with an evaluation.
pub fn explanation(
    score: f64,
    backend: &str,
    resume_skills: &[String],
    required_skills: &[String],
) -> String {
    let matched: Vec<&str> = resume_skills
        .iter()
        .filter(|s| required_skills.iter().any(|r| r.eq_ignore_ascii_case(s)))
        .map(String::as_str)
        .collect();

    if matched.is_empty() {
        format!("Score {score:.2}/100 ({backend} similarity). No required skill matched exactly.")
    } else {
        format!(
            "Score {score:.2}/100 ({backend} similarity). Matching skills: {}.",
            matched.join(", ")
        )
    }
}
