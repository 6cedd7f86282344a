//! Upload policy: batch size, per-file size, PDF checks, job description bounds.

use bytes::Bytes;
use thiserror::Error;

use crate::extraction::sanitize_text;

const BYTES_PER_MB: usize = 1024 * 1024;
const PDF_MAGIC: &[u8] = b"%PDF";

/// One résumé file as received from the client.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub filename: String,
    pub content: Bytes,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error("Missing resumes: at least one file is required")]
    NoFiles,

    #[error("Too many resumes: {count} files (maximum {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("File size ({size_mb:.2} MB) exceeds maximum allowed size of {max_mb} MB")]
    TooLarge { size_mb: f64, max_mb: usize },

    #[error("File must have .pdf extension")]
    NotPdfExtension,

    #[error("File does not appear to be a valid PDF (invalid header)")]
    InvalidPdfHeader,

    #[error("Job description cannot be empty")]
    EmptyJobDescription,

    #[error("Job description too short (minimum {0} characters)")]
    JobDescriptionTooShort(usize),

    #[error("Job description too long (maximum {0} characters)")]
    JobDescriptionTooLong(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_bytes: usize,
    pub job_description_min_chars: usize,
    pub job_description_max_chars: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_file_bytes: 10 * BYTES_PER_MB,
            job_description_min_chars: 10,
            job_description_max_chars: 10_000,
        }
    }
}

impl UploadLimits {
    /// Whole-request check: 1..=max_files.
    pub fn check_batch_size(&self, count: usize) -> Result<(), UploadError> {
        if count == 0 {
            return Err(UploadError::NoFiles);
        }
        if count > self.max_files {
            return Err(UploadError::TooManyFiles {
                count,
                max: self.max_files,
            });
        }
        Ok(())
    }

    /// Per-file check: size, `.pdf` extension, `%PDF` header.
    pub fn check_file(&self, upload: &ResumeUpload) -> Result<(), UploadError> {
        if upload.content.len() > self.max_file_bytes {
            return Err(UploadError::TooLarge {
                size_mb: upload.content.len() as f64 / BYTES_PER_MB as f64,
                max_mb: self.max_file_bytes / BYTES_PER_MB,
            });
        }
        if !upload.filename.to_lowercase().ends_with(".pdf") {
            return Err(UploadError::NotPdfExtension);
        }
        if !upload.content.starts_with(PDF_MAGIC) {
            return Err(UploadError::InvalidPdfHeader);
        }
        Ok(())
    }

    /// Returns the sanitized description, or why it was rejected.
    pub fn check_job_description(&self, raw: &str) -> Result<String, UploadError> {
        let text = sanitize_text(raw);
        let len = text.chars().count();
        if len == 0 {
            return Err(UploadError::EmptyJobDescription);
        }
        if len < self.job_description_min_chars {
            return Err(UploadError::JobDescriptionTooShort(
                self.job_description_min_chars,
            ));
        }
        if len > self.job_description_max_chars {
            return Err(UploadError::JobDescriptionTooLong(
                self.job_description_max_chars,
            ));
        }
        Ok(text)
    }

    /// Largest multipart body the router should accept for one request.
    pub fn max_request_bytes(&self) -> usize {
        self.max_files * self.max_file_bytes + self.job_description_max_chars * 4 + BYTES_PER_MB
    }
}
