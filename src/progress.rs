//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PostConfigBuilder::progress_callback`] to receive events
//! as stages start and finish and as quote cards are rendered.
//!
//! # Example
//!
//! ```rust
//! use pdf2post::{PipelineProgressCallback, PostConfig, StageKind};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     finished: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: StageKind, output_len: usize) {
//!         self.finished.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done ({output_len} bytes)");
//!     }
//! }
//!
//! let config = PostConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { finished: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::stage::StageKind;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it generates text and renders images.
///
/// Independent stages run concurrently, so `on_stage_start`,
/// `on_stage_complete` and `on_stage_error` may be called from different
/// tasks at the same time. Rendering runs on a rayon pool, so
/// `on_image_rendered` may arrive out of quote order. All methods default to
/// no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before any stage runs.
    ///
    /// # Arguments
    /// * `total_stages` — number of generation stages in the plan
    fn on_run_start(&self, total_stages: usize) {
        let _ = total_stages;
    }

    /// Called just before a stage's first generation attempt.
    fn on_stage_start(&self, stage: StageKind) {
        let _ = stage;
    }

    /// Called when a stage has written its output.
    ///
    /// # Arguments
    /// * `output_len` — byte length of the produced text (quotes joined)
    fn on_stage_complete(&self, stage: StageKind, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// Called when a stage fails after all retries.
    fn on_stage_error(&self, stage: StageKind, error: &str) {
        let _ = (stage, error);
    }

    /// Called after each quote card is saved.
    ///
    /// # Arguments
    /// * `index` — 1-indexed quote position
    /// * `total` — number of quote cards being rendered
    fn on_image_rendered(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called once when the run ends, successfully or not.
    fn on_run_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PostConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: Mutex<Vec<(StageKind, String)>>,
        images: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: StageKind) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _stage: StageKind, _output_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_error(&self, stage: StageKind, error: &str) {
            self.errors.lock().unwrap().push((stage, error.to_string()));
        }

        fn on_image_rendered(&self, _index: usize, _total: usize, _path: &Path) {
            self.images.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_stage_start(StageKind::Summarizer);
        cb.on_stage_complete(StageKind::Summarizer, 42);
        cb.on_stage_error(StageKind::QuoteExtractor, "boom");
        cb.on_image_rendered(1, 2, Path::new("out/a_1.png"));
        cb.on_run_complete(false);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_stage_start(StageKind::QuoteExtractor);
        tracker.on_stage_start(StageKind::Summarizer);
        tracker.on_stage_complete(StageKind::Summarizer, 300);
        tracker.on_stage_error(StageKind::QuoteExtractor, "timeout");
        tracker.on_image_rendered(1, 1, Path::new("a_1.png"));

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.images.load(Ordering::SeqCst), 1);
        let errors = tracker.errors.lock().unwrap();
        assert_eq!(errors[0].0, StageKind::QuoteExtractor);
        assert_eq!(errors[0].1, "timeout");
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(3);
        cb.on_run_complete(true);
    }
}
