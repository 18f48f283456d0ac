//! Progress-callback trait for per-file and per-half batch events.
//!
//! Inject an [`Arc<dyn BatchProgress>`] via
//! [`crate::config::BatchConfigBuilder::progress`] to receive events as the
//! orchestrator walks the input directory. Callbacks keep the library free
//! of any terminal/UI dependency: the CLI forwards events to an indicatif
//! bar, a server could forward them to a channel, tests count them.
//!
//! The batch is strictly sequential, so events arrive from a single task in
//! order; the trait is still `Send + Sync` so the same callback can be held
//! by the caller while the run is awaited.

use crate::error::HalfError;
use crate::output::Side;
use std::sync::Arc;

/// Called by the orchestrator as it processes each file and half.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait BatchProgress: Send + Sync {
    /// Called just before a file's halves are dispatched.
    ///
    /// # Arguments
    /// * `file`  — file name within the input directory
    /// * `index` — 0-based position in the filtered listing
    /// * `total` — number of files that matched the extension filter
    fn on_file_start(&self, file: &str, index: usize, total: usize) {
        let _ = (file, index, total);
    }

    /// Called when a file is skipped because it could not be loaded or split.
    fn on_file_skipped(&self, file: &str, error: &HalfError) {
        let _ = (file, error);
    }

    /// Called after one half finished dispatch + extraction, success or not.
    ///
    /// # Arguments
    /// * `records` — records extracted from this half (0 on failure)
    /// * `error`   — present when the half failed
    fn on_half_done(&self, file: &str, side: Side, records: usize, error: Option<&HalfError>) {
        let _ = (file, side, records, error);
    }

    /// Called once after every file has been attempted, before export.
    fn on_batch_complete(&self, files: usize, records: usize) {
        let _ = (files, records);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl BatchProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgress>;
