//! CLI binary for pdf2post.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PostConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2post::generate::resolve_generator;
use pdf2post::{
    PdfiumExtractor, PipelineProgressCallback, PostConfig, PostGenerator, ProgressCallback,
    QuoteCheck, StageKind, Theme,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over the generation stages, then a log line
/// per rendered card. Stages finish out of order when they run concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<StageKind, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading article…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, stage: StageKind) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&stage))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_stages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:30.green/238}] {pos}/{len} stages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_stages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Generating");
    }

    fn on_stage_start(&self, stage: StageKind) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(stage, Instant::now());
        }
        self.bar.set_message(stage.to_string());
    }

    fn on_stage_complete(&self, stage: StageKind, output_len: usize) {
        let secs = self.elapsed_secs(stage);
        self.bar.println(format!(
            "  {} {:<20}  {:<12}  {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{output_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_stage_error(&self, stage: StageKind, error: &str) {
        let secs = self.elapsed_secs(stage);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<20}  {}  {}",
            red("✗"),
            stage.to_string(),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_rendered(&self, index: usize, total: usize, path: &Path) {
        self.bar.set_prefix("Rendering");
        self.bar.println(format!(
            "  {} Card {:>2}/{:<2}  {}",
            green("✓"),
            index,
            total,
            dim(&path.display().to_string()),
        ));
    }

    fn on_run_complete(&self, success: bool) {
        self.bar.finish_and_clear();
        if success {
            eprintln!("{} {}", green("✔"), bold("Post assets ready"));
        } else {
            let failed = self.errors.load(Ordering::SeqCst);
            eprintln!(
                "{} Generation failed ({} stage error(s))",
                red("✘"),
                red(&failed.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Cards, caption and summary into ./output
  pdf2post article.pdf --byline "Jane Doe"

  # Headline look, custom output directory and file stem
  pdf2post article.pdf --theme headline --output-dir cards --title weekly

  # Bundle the cards into images.zip
  pdf2post article.pdf --zip

  # Drop any quote that is not verbatim in the article
  pdf2post article.pdf --quote-check reject

  # Use a specific model
  pdf2post --model gpt-4o --provider openai article.pdf

  # From a URL, JSON result on stdout
  pdf2post https://example.com/story.pdf --json > post.json

OUTPUT FILES:
  {output-dir}/{title}_1.png … {title}_N.png   one 1080×1080 card per quote
  {output-dir}/{title}_caption.txt             the caption
  {output-dir}/images.zip                      with --zip

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
"#;

/// Turn a news-article PDF into quote cards, a summary and a caption.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2post",
    version,
    about = "Turn a news-article PDF into quote cards, a summary and a caption",
    long_about = "Extract the text of a news-article PDF (local file or URL), ask an LLM for \
verbatim pull-quotes and a summary, synthesise a social-media caption from both, and render \
one 1080×1080 quote card per pull-quote. Supports OpenAI, Anthropic, Google Gemini, Azure \
OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Author name drawn under each quote (leading dashes are normalised).
    #[arg(short, long, env = "PDF2POST_BYLINE", default_value = "")]
    byline: String,

    /// Card theme.
    #[arg(long, env = "PDF2POST_THEME", value_enum, default_value = "default")]
    theme: ThemeArg,

    /// Directory for cards and caption.
    #[arg(short, long, env = "PDF2POST_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// File stem for outputs. Default: the input's file name.
    #[arg(long, env = "PDF2POST_TITLE")]
    title: Option<String>,

    /// Also write images.zip with every card.
    #[arg(long, env = "PDF2POST_ZIP")]
    zip: bool,

    /// LLM model ID (e.g. gpt-4o, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2POST_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens per stage.
    #[arg(long, env = "PDF2POST_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Retries per stage on provider errors or timeouts.
    #[arg(long, env = "PDF2POST_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDF2POST_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2POST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Verbatim check for extracted quotes: off, warn, reject.
    #[arg(long, env = "PDF2POST_QUOTE_CHECK", value_enum, default_value = "warn")]
    quote_check: QuoteCheckArg,

    /// Truncate the article to this many characters before generation.
    #[arg(long, env = "PDF2POST_MAX_CHARS")]
    max_chars: Option<usize>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2POST_PASSWORD")]
    password: Option<String>,

    /// Extra directory of .ttf/.otf/.ttc fonts (repeatable).
    #[arg(long = "font-dir", env = "PDF2POST_FONT_DIR")]
    font_dirs: Vec<PathBuf>,

    /// Output structured JSON (PostOutput) instead of text.
    #[arg(long, env = "PDF2POST_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2POST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2POST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2POST_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Default,
    Headline,
    Spotlight,
}

impl From<ThemeArg> for Theme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Default => Theme::Default,
            ThemeArg::Headline => Theme::Headline,
            ThemeArg::Spotlight => Theme::Spotlight,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum QuoteCheckArg {
    Off,
    Warn,
    Reject,
}

impl From<QuoteCheckArg> for QuoteCheck {
    fn from(v: QuoteCheckArg) -> Self {
        match v {
            QuoteCheckArg::Off => QuoteCheck::Off,
            QuoteCheckArg::Warn => QuoteCheck::Warn,
            QuoteCheckArg::Reject => QuoteCheck::Reject,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    // Resolve the provider before touching the input so a missing key
    // fails fast.
    let generator = resolve_generator(&config).context("No usable LLM provider")?;
    let extractor = Arc::new(PdfiumExtractor::new(config.password.clone()));
    let output = PostGenerator::new(extractor, generator, config)
        .run(&cli.input, cli.title.as_deref())
        .await
        .context("Post generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", output.caption);

    if !cli.quiet {
        eprintln!();
        eprintln!("{}", bold("Summary"));
        eprintln!("{}", dim(&output.summary));
        eprintln!();
        for path in output.artifacts() {
            eprintln!("  {} {}", cyan("→"), path.display());
        }
        eprintln!(
            "   {} quotes  {} retries  {} tokens in  /  {} tokens out  —  {}ms total",
            output.quotes.len(),
            output.stats.retries(),
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `PostConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PostConfig> {
    let mut builder = PostConfig::builder()
        .byline(cli.byline.clone())
        .theme(cli.theme.into())
        .output_dir(cli.output_dir.clone())
        .bundle(cli.zip)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .quote_check(cli.quote_check.into());

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(n) = cli.max_chars {
        builder = builder.max_article_chars(n);
    }
    for dir in &cli.font_dirs {
        builder = builder.font_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
