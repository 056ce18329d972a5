//! Text side of the article-to-post conversion.
//!
//! Each submodule implements one step, so each is testable alone and the
//! extraction or generation backend can be swapped without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ orchestrator ──▶ (render)
//! (URL/path) (pdfium)   stage waves
//! ```
//!
//! 1. [`input`]   — canonicalise the user-supplied path or URL to a local file
//! 2. [`extract`] — read the article text; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`orchestrator`] — run the [`stage`]s in dependency order over a
//!    shared [`state`]; the only step with network I/O
//! 4. [`postprocess`] — deterministic cleanup of what the model returned

pub mod extract;
pub mod input;
pub mod orchestrator;
pub mod postprocess;
pub mod stage;
pub mod state;
