//! Top-level entry points: article in, post assets out.
//!
//! ```text
//! input ─▶ resolve ─▶ extract ─▶ Pipeline (quotes ∥ summary ─▶ caption) ─▶ OutputManager
//! ```
//!
//! [`PostGenerator`] wires the collaborators together and is what tests
//! drive with fakes. [`generate_post`] is the convenience wrapper that
//! resolves a provider from the config and uses pdfium for extraction.

use crate::config::PostConfig;
use crate::error::PostError;
use crate::generate::{resolve_generator, TextGenerator};
use crate::output::{OutputManager, PostOutput};
use crate::pipeline::extract::{extract_article, PdfiumExtractor, TextExtractor};
use crate::pipeline::input::ArticleSource;
use crate::pipeline::orchestrator::Pipeline;
use crate::render::font::FontBook;
use crate::render::Typesetter;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// One configured article-to-post conversion.
pub struct PostGenerator {
    extractor: Arc<dyn TextExtractor>,
    pipeline: Pipeline,
    typesetter: Arc<Typesetter>,
    config: PostConfig,
}

impl PostGenerator {
    /// Wire `extractor` and `generator` under `config`. Fonts are loaded
    /// once here and shared by every card.
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn TextGenerator>,
        config: PostConfig,
    ) -> Self {
        let fonts = FontBook::new(&config.font_dirs, config.system_fonts);
        Self {
            extractor,
            pipeline: Pipeline::new(generator, &config),
            typesetter: Arc::new(Typesetter::new(fonts)),
            config,
        }
    }

    /// Share an already-loaded typesetter between generators.
    pub fn with_typesetter(mut self, typesetter: Arc<Typesetter>) -> Self {
        self.typesetter = typesetter;
        self
    }

    pub fn config(&self) -> &PostConfig {
        &self.config
    }

    /// Convert the article at `input` (local path or URL).
    ///
    /// Output files are named from `title`, or from the input's file stem
    /// when `title` is `None`.
    ///
    /// # Errors
    /// An extraction failure returns before any generation call is made.
    /// A failed stage returns before any file is written.
    pub async fn run(&self, input: &str, title: Option<&str>) -> Result<PostOutput, PostError> {
        self.notify_start();
        let result = self.run_inner(input, title).await;
        self.notify_complete(result.is_ok());
        result
    }

    /// Convert already-extracted article text.
    pub async fn run_text(&self, article: &str, stem: &str) -> Result<PostOutput, PostError> {
        self.notify_start();
        let result = self.generate_and_write(article, stem, Instant::now()).await;
        self.notify_complete(result.is_ok());
        result
    }

    async fn run_inner(&self, input_str: &str, title: Option<&str>) -> Result<PostOutput, PostError> {
        let start = Instant::now();
        info!("Starting post generation: {}", input_str);

        // ── Step 1: Resolve input ────────────────────────────────────────
        let source = ArticleSource::resolve(input_str, self.config.download_timeout_secs).await?;
        let stem = match title {
            Some(t) if !t.trim().is_empty() => t.trim(),
            _ => source.stem(),
        };

        // ── Step 2: Extract article text ─────────────────────────────────
        let article = extract_article(Arc::clone(&self.extractor), source.path()).await?;
        info!(
            "Extracted {} characters from {}",
            article.chars().count(),
            source.path().display()
        );

        // ── Step 3: Generate and write ───────────────────────────────────
        self.generate_and_write(&article, stem, start).await
    }

    async fn generate_and_write(
        &self,
        article: &str,
        stem: &str,
        start: Instant,
    ) -> Result<PostOutput, PostError> {
        let (content, mut stats) = self.pipeline.run(article).await?;
        debug!(
            "Generated {} quote(s), summary {} chars, caption {} chars",
            content.quotes.len(),
            content.summary.len(),
            content.caption.len()
        );

        let output = OutputManager::new(Arc::clone(&self.typesetter), &self.config);
        let written = output.write(&content, stem).await?;

        stats.render_duration_ms = written.duration_ms;
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Post complete: {} card(s), {} tokens in / {} out, {}ms total",
            written.images.len(),
            stats.total_input_tokens,
            stats.total_output_tokens,
            stats.total_duration_ms
        );

        Ok(PostOutput {
            summary: content.summary,
            quotes: content.quotes,
            caption: content.caption,
            images: written.images,
            caption_path: written.caption_path,
            bundle: written.bundle,
            stats,
        })
    }

    fn notify_start(&self) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(self.pipeline.stages().len());
        }
    }

    fn notify_complete(&self, success: bool) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_complete(success);
        }
    }
}

/// Generate a post from a PDF file or URL.
///
/// This is the primary entry point for the library. The provider is
/// resolved from `config` before the input is touched, so a missing API key
/// fails fast with [`PostError::ProviderNotConfigured`].
///
/// # Example
/// ```rust,no_run
/// use pdf2post::{generate_post, PostConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PostConfig::builder().byline("Jane Doe").build()?;
/// let output = generate_post("article.pdf", &config).await?;
/// println!("{}", output.caption);
/// for card in &output.images {
///     println!("{}", card.display());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn generate_post(
    input_str: impl AsRef<str>,
    config: &PostConfig,
) -> Result<PostOutput, PostError> {
    let generator = resolve_generator(config)?;
    let extractor = Arc::new(PdfiumExtractor::new(config.password.clone()));
    PostGenerator::new(extractor, generator, config.clone())
        .run(input_str.as_ref(), None)
        .await
}

/// Generate a post from article text that has already been extracted.
pub async fn generate_post_from_text(
    article: &str,
    stem: &str,
    config: &PostConfig,
) -> Result<PostOutput, PostError> {
    let generator = resolve_generator(config)?;
    let extractor = Arc::new(PdfiumExtractor::new(config.password.clone()));
    PostGenerator::new(extractor, generator, config.clone())
        .run_text(article, stem)
        .await
}

/// Generate a post from PDF bytes in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed on
/// return. Output files use `stem`.
pub async fn generate_post_from_bytes(
    bytes: &[u8],
    stem: &str,
    config: &PostConfig,
) -> Result<PostOutput, PostError> {
    let generator = resolve_generator(config)?;
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| PostError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| PostError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();

    let extractor = Arc::new(PdfiumExtractor::new(config.password.clone()));
    // `tmp` is dropped (and the file deleted) when the run returns
    PostGenerator::new(extractor, generator, config.clone())
        .run(&path, Some(stem))
        .await
}

/// Synchronous wrapper around [`generate_post`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_post_sync(
    input_str: impl AsRef<str>,
    config: &PostConfig,
) -> Result<PostOutput, PostError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PostError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_post(input_str, config))
}
