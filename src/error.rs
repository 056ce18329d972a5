//! Error types for the pdf2post library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PostError`] — **Fatal**: the run cannot produce a complete artifact
//!   set (bad input file, provider not configured, a generation stage failed,
//!   an image could not be saved). Returned as `Err(PostError)` from the
//!   top-level entry points.
//!
//! * [`GenerationError`] — a single text-generation call failed. It is
//!   wrapped into [`PostError::StageFailed`] by the orchestrator once retries
//!   are exhausted, so the caller always learns *which* stage broke.
//!
//! Font and logo problems are deliberately absent from both enums: the
//! typesetter degrades to built-in glyphs or a text wordmark and logs a
//! warning instead.

use crate::pipeline::stage::StageKind;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure category of a [`PostError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FailureKind {
    /// The article text could not be obtained.
    Extraction,
    /// A generation stage failed.
    Generation,
    /// An output artifact could not be written.
    Render,
    /// Missing credentials or invalid settings.
    Config,
    /// Bug or runtime failure unrelated to the inputs.
    Internal,
}

/// All fatal errors returned by the pdf2post library.
#[derive(Debug, Error)]
pub enum PostError {
    // ── Input / extraction errors ─────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Every page was empty or unreadable.
    #[error("No text could be extracted from '{path}'")]
    NoText { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Generation errors ─────────────────────────────────────────────────
    /// A generation stage failed after all retries.
    #[error("Stage '{stage}' failed after {attempts} attempt(s): {source}")]
    StageFailed {
        stage: StageKind,
        attempts: u32,
        #[source]
        source: GenerationError,
    },

    // ── Render / output errors ────────────────────────────────────────────
    /// PNG encoding or writing failed.
    #[error("Failed to save image '{path}': {source}")]
    ImageSaveFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Could not create or write a text artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Zip bundling failed.
    #[error("Failed to bundle artifacts into '{path}': {detail}")]
    BundleFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PostError {
    /// Map the error onto its failure category.
    pub fn kind(&self) -> FailureKind {
        match self {
            PostError::FileNotFound { .. }
            | PostError::PermissionDenied { .. }
            | PostError::InvalidInput { .. }
            | PostError::DownloadFailed { .. }
            | PostError::DownloadTimeout { .. }
            | PostError::NotAPdf { .. }
            | PostError::CorruptPdf { .. }
            | PostError::PasswordRequired { .. }
            | PostError::WrongPassword { .. }
            | PostError::NoText { .. }
            | PostError::PdfiumBindingFailed(_) => FailureKind::Extraction,
            PostError::StageFailed { .. } => FailureKind::Generation,
            PostError::ImageSaveFailed { .. }
            | PostError::OutputWriteFailed { .. }
            | PostError::BundleFailed { .. } => FailureKind::Render,
            PostError::ProviderNotConfigured { .. } | PostError::InvalidConfig(_) => {
                FailureKind::Config
            }
            PostError::Internal(_) => FailureKind::Internal,
        }
    }

    /// The stage that failed, for [`FailureKind::Generation`] errors.
    pub fn failed_stage(&self) -> Option<StageKind> {
        match self {
            PostError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// A failed text-generation call.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum GenerationError {
    /// The stage input was empty or whitespace-only; no call was made.
    #[error("input is empty; nothing to generate from")]
    EmptyInput,

    /// The provider returned an error (quota, network, model failure).
    #[error("provider error: {0}")]
    Provider(String),

    /// The call did not finish within the configured timeout.
    #[error("call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The response did not have the requested shape.
    #[error("malformed response: {0}")]
    MalformedOutput(String),

    /// Every extracted quote failed the verbatim check.
    #[error("none of the {rejected} extracted quote(s) appear verbatim in the article")]
    NoVerbatimQuotes { rejected: usize },
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Provider(_) | GenerationError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failure_names_stage_and_cause() {
        let e = PostError::StageFailed {
            stage: StageKind::Summarizer,
            attempts: 3,
            source: GenerationError::Provider("quota exceeded".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("summarizer"), "got: {msg}");
        assert!(msg.contains("quota exceeded"), "got: {msg}");
        assert_eq!(e.kind(), FailureKind::Generation);
        assert_eq!(e.failed_stage(), Some(StageKind::Summarizer));
    }

    #[test]
    fn extraction_errors_are_tagged() {
        let e = PostError::FileNotFound {
            path: PathBuf::from("missing.pdf"),
        };
        assert_eq!(e.kind(), FailureKind::Extraction);
        assert_eq!(e.failed_stage(), None);

        let e = PostError::CorruptPdf {
            path: PathBuf::from("bad.pdf"),
            detail: "xref".into(),
        };
        assert_eq!(e.kind(), FailureKind::Extraction);
    }

    #[test]
    fn config_errors_are_tagged() {
        let e = PostError::ProviderNotConfigured {
            provider: "auto".into(),
            hint: "set OPENAI_API_KEY".into(),
        };
        assert_eq!(e.kind(), FailureKind::Config);
        assert_eq!(PostError::InvalidConfig("x".into()).kind(), FailureKind::Config);
    }

    #[test]
    fn only_transient_errors_retry() {
        assert!(GenerationError::Provider("503".into()).is_retryable());
        assert!(GenerationError::Timeout { secs: 5 }.is_retryable());
        assert!(!GenerationError::EmptyInput.is_retryable());
        assert!(!GenerationError::MalformedOutput("not json".into()).is_retryable());
        assert!(!GenerationError::NoVerbatimQuotes { rejected: 2 }.is_retryable());
    }

    #[test]
    fn timeout_display() {
        let e = GenerationError::Timeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }
}
