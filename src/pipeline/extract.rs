//! Article text extraction.
//!
//! [`TextExtractor`] is the seam between the pipeline and whatever reads the
//! article file. [`PdfiumExtractor`] is the production implementation; tests
//! substitute fakes.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while parsing. [`extract_article`] moves the work onto
//! Tokio's blocking pool so async workers never stall on a large PDF.

use crate::error::PostError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads the raw text of an article file.
pub trait TextExtractor: Send + Sync {
    /// Concatenated page text of the file at `path`.
    ///
    /// Per-page failures are logged and skipped. Failing every page, or
    /// reading no text at all, is [`PostError::NoText`].
    fn extract_text(&self, path: &Path) -> Result<String, PostError>;
}

/// Run `extractor` on Tokio's blocking pool.
pub async fn extract_article(
    extractor: Arc<dyn TextExtractor>,
    path: &Path,
) -> Result<String, PostError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extractor.extract_text(&path))
        .await
        .map_err(|e| PostError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// [`TextExtractor`] backed by pdfium.
///
/// The library is located in this order:
/// 1. `PDFIUM_LIB_PATH` (file path to the shared library)
/// 2. the platform library name in the current directory
/// 3. the system library search path
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    password: Option<String>,
}

impl PdfiumExtractor {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    fn bind() -> Result<Pdfium, PostError> {
        if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
            let p = PathBuf::from(env_path);
            if p.exists() {
                return Pdfium::bind_to_library(&p)
                    .map(Pdfium::new)
                    .map_err(|e| PostError::PdfiumBindingFailed(format!("{}: {}", p.display(), e)));
            }
            warn!("PDFIUM_LIB_PATH '{}' not found; trying defaults", p.display());
        }

        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map(Pdfium::new)
            .map_err(|e| PostError::PdfiumBindingFailed(e.to_string()))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, PostError> {
        let pdfium = Self::bind()?;
        let password = self.password.as_deref();

        let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    PostError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    PostError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            } else {
                PostError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let mut page_texts = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(text) => {
                    let text = text.all();
                    debug!("Page {}: {} chars", idx + 1, text.len());
                    page_texts.push(text);
                }
                Err(e) => warn!("Page {}: text extraction failed — {:?}", idx + 1, e),
            }
        }

        join_pages(page_texts).ok_or_else(|| PostError::NoText {
            path: path.to_path_buf(),
        })
    }
}

/// Join page texts with a blank line. `None` when nothing but whitespace was read.
fn join_pages(pages: Vec<String>) -> Option<String> {
    let kept: Vec<String> = pages
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join("\n\n"))
    }
}
