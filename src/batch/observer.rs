//! # Batch Observers
//!
//! The batch runner reports progress through [`BatchObserver`] instead of
//! printing, so the engines stay free of output side effects.

use std::path::Path;

use log::{debug, error, info, warn};

use super::report::{BatchReport, BatchResult, ItemOutcome};
use crate::files::SkipReason;

/// Receives batch progress. Called from worker threads, so implementations
/// must be `Send + Sync`.
pub trait BatchObserver: Send + Sync {
    /// An item is about to be processed.
    fn item_started(&self, _source: &Path) {}

    /// An item finished, successfully or not.
    fn item_finished(&self, _result: &BatchResult) {}

    /// An entry below the root could not be read while walking.
    fn walk_error(&self, _path: &Path, _reason: &str) {}

    /// The whole batch finished.
    fn batch_finished(&self, _report: &BatchReport) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl BatchObserver for SilentObserver {}

/// Observer that forwards progress to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl BatchObserver for LogObserver {
    fn item_started(&self, source: &Path) {
        debug!("⏳ Processing {}", source.display());
    }

    fn item_finished(&self, result: &BatchResult) {
        match &result.outcome {
            ItemOutcome::Succeeded { bytes_written } => info!(
                "✅ {} -> {} ({} bytes)",
                result.source.display(),
                result.destination.display(),
                bytes_written
            ),
            ItemOutcome::Skipped {
                reason: SkipReason::AlreadyExists,
            } => warn!(
                "⏭️  Output file {} already exists. Overwrite with --overwrite.",
                result.destination.display()
            ),
            ItemOutcome::Skipped { reason } => warn!(
                "⏭️  Skipping {}: {}",
                result.source.display(),
                reason
            ),
            ItemOutcome::Failed { error, .. } => {
                error!("❌ {}: {}", result.source.display(), error)
            }
        }
    }

    fn walk_error(&self, path: &Path, reason: &str) {
        warn!("⚠️  Cannot read {}: {}", path.display(), reason);
    }

    fn batch_finished(&self, report: &BatchReport) {
        let stats = report.aggregate();
        info!(
            "📊 Batch finished in {:.2}s: {} succeeded, {} skipped, {} failed",
            report.elapsed.as_secs_f64(),
            stats.succeeded,
            stats.skipped,
            stats.failed
        );
    }
}
