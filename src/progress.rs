//! Progress-callback trait for pipeline runs.
//!
//! Pass any [`ExtractionProgressCallback`] to
//! [`crate::extract::DocumentPipeline::run`] to receive stage changes and a
//! single 0–100 progress value suitable for one continuous progress bar.
//! Plain closures work too:
//!
//! ```rust
//! use propdoc_extract::ExtractionProgressCallback;
//!
//! let cb = |percent: u8| eprintln!("{percent}%");
//! cb.on_progress(40);
//! ```
//!
//! Within one run, `on_progress` values never decrease and a successful run
//! always ends with `on_progress(100)` followed by `on_complete()`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Stages of a pipeline run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    Converting,
    Prompting,
    Completing,
    Parsing,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Validating => "Validating",
            PipelineStage::Converting => "Extracting text",
            PipelineStage::Prompting => "Building prompt",
            PipelineStage::Completing => "Querying model",
            PipelineStage::Parsing => "Parsing response",
            PipelineStage::Done => "Done",
            PipelineStage::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a run advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called when a stage begins, and with `Done` / `Failed` at the end.
    fn on_stage(&self, stage: PipelineStage) {
        let _ = stage;
    }

    /// Overall progress in `[0, 100]`, non-decreasing within a run.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called once after a successful run.
    fn on_complete(&self) {}

    /// Called once with the terminal error message of a failed run.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

impl<F> ExtractionProgressCallback for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent)
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Maps stage-local percentages onto the overall scale and suppresses
/// regressions.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ExtractionProgressCallback,
    reported: AtomicU8,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ExtractionProgressCallback) -> Self {
        Self {
            sink,
            reported: AtomicU8::new(0),
        }
    }

    pub(crate) fn stage(&self, stage: PipelineStage) {
        self.sink.on_stage(stage);
    }

    /// Report overall progress; values below the last report are dropped.
    pub(crate) fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let prev = self.reported.fetch_max(percent, Ordering::SeqCst);
        if percent > prev {
            self.sink.on_progress(percent);
        }
    }

    /// A view that maps `0..=100` onto `start..=end`.
    pub(crate) fn span(&self, start: u8, end: u8) -> StageProgress<'_> {
        StageProgress {
            tracker: self,
            start,
            end,
        }
    }

    pub(crate) fn sink(&self) -> &dyn ExtractionProgressCallback {
        self.sink
    }
}

/// One stage's share of the overall progress scale.
///
/// Stages receive this as a plain callback and report `0..=100` of their own
/// work; the mapping onto the run-wide value happens here.
pub(crate) struct StageProgress<'t> {
    tracker: &'t ProgressTracker<'t>,
    start: u8,
    end: u8,
}

impl StageProgress<'_> {
    /// Report `local` percent of this stage's share.
    pub(crate) fn report(&self, local: u8) {
        let local = u32::from(local.min(100));
        let width = u32::from(self.end.saturating_sub(self.start));
        let overall = u32::from(self.start) + width * local / 100;
        self.tracker.report(overall as u8);
    }
}

impl ExtractionProgressCallback for StageProgress<'_> {
    fn on_progress(&self, percent: u8) {
        self.report(percent);
    }
}
