//! # pdf2post
//!
//! Turn a news-article PDF into social-media assets: a short summary, a set
//! of verbatim pull-quotes, a caption written from both, and one square
//! quote card per pull-quote.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   article text via pdfium (spawn_blocking)
//!  ├─ 3. Generate  quote extractor ∥ summarizer, then caption synthesizer
//!  ├─ 4. Polish    fence stripping, quote parsing, verbatim check
//!  ├─ 5. Render    1080×1080 PNG per quote (rayon on the blocking pool)
//!  └─ 6. Output    cards + caption file (+ optional images.zip)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2post::{generate_post, PostConfig, Theme};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = PostConfig::builder()
//!         .byline("Jane Doe")
//!         .theme(Theme::Headline)
//!         .build()?;
//!     let output = generate_post("article.pdf", &config).await?;
//!     println!("{}", output.caption);
//!     eprintln!("{} cards, {} tokens in / {} out",
//!         output.images.len(),
//!         output.stats.total_input_tokens,
//!         output.stats.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Rendering only
//!
//! The typesetter has no dependency on the generation side:
//!
//! ```rust,no_run
//! use pdf2post::{render, RenderSpec, Theme};
//!
//! let spec = RenderSpec::new("It is later than you think.", "Jane Doe", "card", Theme::Spotlight)
//!     .with_output_dir("output");
//! let path = render(&spec)?;
//! # Ok::<(), pdf2post::PostError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2post` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2post = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PostConfig, PostConfigBuilder, QuoteCheck};
pub use convert::{
    generate_post, generate_post_from_bytes, generate_post_from_text, generate_post_sync,
    PostGenerator,
};
pub use error::{FailureKind, GenerationError, PostError};
pub use generate::{EdgequakeGenerator, Generated, GenerationRequest, TextGenerator};
pub use output::{bundle_zip, OutputManager, PostOutput};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::orchestrator::{Pipeline, RunStats, StageStats};
pub use pipeline::stage::{GenerationStage, StageKind};
pub use pipeline::state::{PipelineState, PostContent, StateField};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use render::theme::{Masthead, Theme, ThemeConfig};
pub use render::{render, RenderSpec, Typesetter};
