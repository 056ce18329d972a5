//! Dependency-ordered execution of generation stages.
//!
//! The orchestrator owns the [`PipelineState`] for one run. It repeatedly
//! picks every pending stage whose inputs are present, runs that wave
//! concurrently, and applies the outputs once the whole wave has settled:
//!
//! ```text
//! wave 1:  QuoteExtractor ─┐
//!          Summarizer ─────┤   (concurrent, both read only `article`)
//! wave 2:  CaptionSynthesizer  (needs `summary` and `quotes`)
//! ```
//!
//! A failed stage ends the run after its wave: nothing downstream is
//! invoked, so a caption is never synthesised from incomplete inputs.
//!
//! ## Retry Strategy
//!
//! Each call is bounded by `api_timeout_secs`. Provider errors and timeouts
//! are retried with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`);
//! with 500 ms base and 2 retries the waits are 500 ms → 1 s. Malformed
//! output and empty input fail the stage on the first attempt.

use crate::config::{PostConfig, QuoteCheck};
use crate::error::{GenerationError, PostError};
use crate::generate::{GenerationRequest, TextGenerator};
use crate::pipeline::stage::{GenerationStage, StageKind};
use crate::pipeline::state::{PipelineState, PostContent, StageOutput};
use crate::progress::ProgressCallback;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Timing and token accounting for one stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageStats {
    pub stage: Option<StageKind>,
    /// Generation attempts made (0 when the input was empty).
    pub attempts: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    pub succeeded: bool,
}

/// Statistics for a whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Per-stage records, in completion-wave order.
    pub stages: Vec<StageStats>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Wall-clock time of text generation.
    pub generation_duration_ms: u64,
    /// Wall-clock time of image rendering and file output.
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl RunStats {
    fn record(&mut self, stats: StageStats) {
        self.total_input_tokens += stats.input_tokens;
        self.total_output_tokens += stats.output_tokens;
        self.stages.push(stats);
    }

    /// Retries spent across all stages.
    pub fn retries(&self) -> u32 {
        self.stages
            .iter()
            .map(|s| s.attempts.saturating_sub(1))
            .sum()
    }
}

/// Result of driving a state through the stage graph.
#[derive(Debug)]
pub struct PipelineRun {
    /// Final state. Fields of stages that never ran or failed stay `None`.
    pub state: PipelineState,
    pub stats: RunStats,
    /// The first failure in declaration order, if any stage failed.
    pub failure: Option<PostError>,
}

/// Runs generation stages against a [`TextGenerator`].
///
/// The generator is injected at construction; the pipeline never builds one.
pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    stages: Vec<GenerationStage>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
    quote_check: QuoteCheck,
    max_article_chars: Option<usize>,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    /// A pipeline over the three standard stages.
    pub fn new(generator: Arc<dyn TextGenerator>, config: &PostConfig) -> Self {
        Self::with_stages(generator, GenerationStage::standard(config), config)
    }

    /// A pipeline over a custom stage list.
    pub fn with_stages(
        generator: Arc<dyn TextGenerator>,
        stages: Vec<GenerationStage>,
        config: &PostConfig,
    ) -> Self {
        Self {
            generator,
            stages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
            quote_check: config.quote_check,
            max_article_chars: config.max_article_chars,
            progress: config.progress_callback.clone(),
        }
    }

    pub fn stages(&self) -> &[GenerationStage] {
        &self.stages
    }

    /// Generate summary, quotes and caption for `article`.
    pub async fn run(&self, article: &str) -> Result<(PostContent, RunStats), PostError> {
        let article = match self.max_article_chars {
            Some(limit) => truncate_chars(article, limit),
            None => article,
        };

        let run = self.execute(PipelineState::new(article)).await;
        if let Some(err) = run.failure {
            return Err(err);
        }
        match run.state.into_complete() {
            Some(content) => Ok((content, run.stats)),
            None => Err(PostError::Internal(
                "pipeline finished without writing every field".into(),
            )),
        }
    }

    /// Drive `state` through every stage whose output is still missing.
    pub async fn execute(&self, mut state: PipelineState) -> PipelineRun {
        let start = Instant::now();
        let mut stats = RunStats::default();
        let mut pending: Vec<&GenerationStage> =
            self.stages.iter().filter(|s| !state.has(s.output)).collect();

        while !pending.is_empty() {
            let (ready, blocked): (Vec<&GenerationStage>, Vec<&GenerationStage>) =
                pending.into_iter().partition(|s| s.is_ready(&state));

            if ready.is_empty() {
                let names: Vec<String> = blocked.iter().map(|s| s.kind.to_string()).collect();
                return PipelineRun {
                    state,
                    stats,
                    failure: Some(PostError::Internal(format!(
                        "stages with unsatisfiable inputs: {}",
                        names.join(", ")
                    ))),
                };
            }

            debug!(
                "Running wave of {} stage(s), {} waiting",
                ready.len(),
                blocked.len()
            );
            let results = join_all(ready.iter().map(|s| self.run_stage(s, &state))).await;

            let mut failure = None;
            for (stage, (result, stage_stats)) in ready.iter().zip(results) {
                stats.record(stage_stats);
                match result {
                    Ok(output) => {
                        if let Err(e) = state.apply(stage.output, output) {
                            failure.get_or_insert(PostError::Internal(e));
                        }
                    }
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }

            if failure.is_some() {
                stats.generation_duration_ms = start.elapsed().as_millis() as u64;
                return PipelineRun {
                    state,
                    stats,
                    failure,
                };
            }
            pending = blocked;
        }

        stats.generation_duration_ms = start.elapsed().as_millis() as u64;
        PipelineRun {
            state,
            stats,
            failure: None,
        }
    }

    /// Run one stage to completion, retrying transient failures.
    async fn run_stage(
        &self,
        stage: &GenerationStage,
        state: &PipelineState,
    ) -> (Result<StageOutput, PostError>, StageStats) {
        let start = Instant::now();
        let mut stats = StageStats {
            stage: Some(stage.kind),
            ..Default::default()
        };
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(stage.kind);
        }

        let result = match stage.request(state, self.temperature, self.max_tokens) {
            Ok(request) => self.attempt_until_done(stage, &request, state, &mut stats).await,
            Err(e) => Err(e),
        };
        stats.duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                stats.succeeded = true;
                info!(
                    "Stage {}: done in {}ms ({} attempt(s))",
                    stage.kind, stats.duration_ms, stats.attempts
                );
                if let Some(ref cb) = self.progress {
                    cb.on_stage_complete(stage.kind, output.len());
                }
                (Ok(output), stats)
            }
            Err(source) => {
                warn!("Stage {}: failed — {}", stage.kind, source);
                if let Some(ref cb) = self.progress {
                    cb.on_stage_error(stage.kind, &source.to_string());
                }
                let err = PostError::StageFailed {
                    stage: stage.kind,
                    attempts: stats.attempts,
                    source,
                };
                (Err(err), stats)
            }
        }
    }

    async fn attempt_until_done(
        &self,
        stage: &GenerationStage,
        request: &GenerationRequest,
        state: &PipelineState,
        stats: &mut StageStats,
    ) -> Result<StageOutput, GenerationError> {
        loop {
            stats.attempts += 1;
            let call = timeout(
                Duration::from_secs(self.api_timeout_secs),
                self.generator.generate(request),
            )
            .await;

            let outcome = match call {
                Ok(Ok(generated)) => {
                    stats.input_tokens += generated.input_tokens;
                    stats.output_tokens += generated.output_tokens;
                    stage.interpret(&generated, &state.article, self.quote_check)
                }
                Ok(Err(e)) => Err(e),
                Err(_) => Err(GenerationError::Timeout {
                    secs: self.api_timeout_secs,
                }),
            };

            match outcome {
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() && stats.attempts <= self.max_retries => {
                    let backoff = backoff_ms(self.retry_backoff_ms, stats.attempts);
                    warn!(
                        "Stage {}: attempt {} failed — {}; retry {}/{} after {}ms",
                        stage.kind, stats.attempts, e, stats.attempts, self.max_retries, backoff
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Upper bound on a single retry wait.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Wait before retrying after failed attempt `attempt` (1-based):
/// `base · 2^(attempt-1)`, capped at [`MAX_BACKOFF_MS`].
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .map_or(u64::MAX, |factor| base.saturating_mul(factor))
        .min(MAX_BACKOFF_MS)
}

/// Cut `text` to at most `limit` characters on a char boundary.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => {
            info!(
                "Article truncated to {} characters before generation",
                limit
            );
            &text[..idx]
        }
        None => text,
    }
}
