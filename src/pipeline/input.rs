//! Article source resolution.
//!
//! An input is either a local PDF or an HTTP(S) URL. URLs are fetched into a
//! `TempDir` owned by the [`ArticleSource`], so the file outlives extraction
//! and disappears with the source. Both kinds pass the same `%PDF` header
//! check, and both carry the stem that names the output files.

use crate::error::PostError;
use crate::output::DEFAULT_STEM;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A readable PDF on disk plus the stem its outputs are named after.
#[derive(Debug)]
pub struct ArticleSource {
    path: PathBuf,
    stem: String,
    download: Option<TempDir>,
}

impl ArticleSource {
    /// Resolve `input` to a local PDF, downloading it first when it is a URL.
    pub async fn resolve(input: &str, timeout_secs: u64) -> Result<Self, PostError> {
        if is_url(input) {
            fetch(input, timeout_secs).await
        } else {
            open_local(Path::new(input))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem of the article: the local file name, or the last URL segment.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn is_downloaded(&self) -> bool {
        self.download.is_some()
    }
}

/// True for `http://` and `https://` inputs.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn open_local(path: &Path) -> Result<ArticleSource, PostError> {
    let path = path.to_path_buf();
    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    let opened = std::fs::File::open(&path).and_then(|f| {
        f.take(PDF_MAGIC.len() as u64).read_to_end(&mut head)
    });
    match opened {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PostError::PermissionDenied { path });
        }
        Err(_) => return Err(PostError::FileNotFound { path }),
    }
    check_pdf_header(&path, &head)?;

    debug!("Article source: {}", path.display());
    Ok(ArticleSource {
        stem: stem_of_name(path.file_stem().map(|s| s.to_string_lossy())),
        path,
        download: None,
    })
}

async fn fetch(url: &str, timeout_secs: u64) -> Result<ArticleSource, PostError> {
    info!("Downloading article from {}", url);
    let failed = |e: reqwest::Error| {
        if e.is_timeout() {
            PostError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PostError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(failed)?;
    let bytes = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(failed)?
        .bytes()
        .await
        .map_err(failed)?;

    let name = url_file_name(url);
    let dir = TempDir::new().map_err(|e| PostError::Internal(format!("temp dir: {}", e)))?;
    let path = dir.path().join(format!("{}.pdf", name));
    check_pdf_header(&path, &bytes)?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| PostError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;

    info!("Downloaded {} bytes to {}", bytes.len(), path.display());
    Ok(ArticleSource {
        path,
        stem: name,
        download: Some(dir),
    })
}

/// Anything that starts with four bytes other than `%PDF` is rejected.
/// Shorter files are left for the extractor to report.
fn check_pdf_header(path: &Path, head: &[u8]) -> Result<(), PostError> {
    match head.get(..PDF_MAGIC.len()) {
        Some(magic) if magic != PDF_MAGIC => {
            let mut found = [0u8; 4];
            found.copy_from_slice(magic);
            Err(PostError::NotAPdf {
                path: path.to_path_buf(),
                magic: found,
            })
        }
        _ => Ok(()),
    }
}

/// Stem of the last non-empty URL path segment, extension dropped.
fn url_file_name(url: &str) -> String {
    let segment = reqwest::Url::parse(url).ok().and_then(|u| {
        u.path_segments()?
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string)
    });
    stem_of_name(segment.as_deref().map(|s| {
        Path::new(s)
            .file_stem()
            .map(|f| f.to_string_lossy())
            .unwrap_or_default()
    }))
}

fn stem_of_name<S: AsRef<str>>(name: Option<S>) -> String {
    name.map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STEM.to_string())
}
