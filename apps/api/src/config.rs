use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::evaluation::UploadLimits;

/// Which `SimilarityScorer` backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityBackend {
    /// Gemini embeddings + cosine.
    Embedding,
    /// Offline term-frequency cosine.
    Lexical,
}

impl FromStr for SimilarityBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedding" => Ok(Self::Embedding),
            "lexical" => Ok(Self::Lexical),
            other => bail!("SIMILARITY_BACKEND must be 'embedding' or 'lexical', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Everything has a default except the optional credentials.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_embedding_model: String,
    pub similarity_backend: SimilarityBackend,
    pub max_files: usize,
    pub max_file_size_mb: usize,
    pub ai_timeout: Duration,
    pub job_description_min_chars: usize,
    pub job_description_max_chars: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: optional_env("DATABASE_URL"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_embedding_model: env_or("GEMINI_EMBEDDING_MODEL", "text-embedding-004"),
            similarity_backend: env_or("SIMILARITY_BACKEND", "embedding").parse()?,
            max_files: parse_env("MAX_FILES", 20)?,
            max_file_size_mb: parse_env("MAX_FILE_SIZE_MB", 10)?,
            ai_timeout: Duration::from_secs(parse_env("AI_TIMEOUT_SECS", 120)?),
            job_description_min_chars: parse_env("JOB_DESCRIPTION_MIN_CHARS", 10)?,
            job_description_max_chars: parse_env("JOB_DESCRIPTION_MAX_CHARS", 10_000)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_files: self.max_files,
            max_file_bytes: self.max_file_size_mb * 1024 * 1024,
            job_description_min_chars: self.job_description_min_chars,
            job_description_max_chars: self.job_description_max_chars,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            bail!("MAX_FILES must be at least 1");
        }
        if self.max_file_size_mb == 0 {
            bail!("MAX_FILE_SIZE_MB must be at least 1");
        }
        if self.job_description_min_chars > self.job_description_max_chars {
            bail!("JOB_DESCRIPTION_MIN_CHARS must not exceed JOB_DESCRIPTION_MAX_CHARS");
        }
        Ok(())
    }
}

/// Unset and blank are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
