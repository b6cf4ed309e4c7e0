//! # Batch Runner
//!
//! Applies one operation to every qualifying file under a directory.
//!
//! ## Concurrency
//! Discovery runs first, on the blocking pool. Items are then dispatched to
//! `spawn_blocking` workers, each holding a semaphore permit, so at most
//! `max_workers` files are open and decoded at any moment however large the
//! directory is. The key and the mode are shared read-only through `Arc`.
//!
//! ## Failure Isolation
//! Each item's error (or panic) is caught at the item boundary and recorded
//! in its [`BatchResult`]. Only enumeration failures abort the run.
//! Sources that map to a destination already claimed by an earlier item are
//! skipped before any work is dispatched.
//!
//! ```text
//! discover ──► [item 1] ──permit──► worker ──► BatchResult
//!          └─► [item 2] ──permit──► worker ──► BatchResult
//!          └─► [item N] ──(waits for a free permit)──► ...
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use super::observer::{BatchObserver, LogObserver};
use super::report::{BatchReport, BatchResult, ItemOutcome};
use super::walker::{self, BatchItem, Selection, TraversalPolicy};
use crate::common::config::{BatchConfig, DEFAULT_ENCRYPTED_EXT, DEFAULT_MAX_WORKERS};
use crate::crypto::Key;
use crate::error::{PixelLockError, Result};
use crate::files::{self, FileOutcome, SkipReason};
use crate::processing::{OutputFormat, StegoScheme};

/// Operation applied to every item.
#[derive(Debug, Clone)]
pub enum BatchMode {
    /// Encrypt every image; destinations gain the encrypted suffix.
    Encrypt { key: Arc<Key> },
    /// Decrypt every suffixed file; destinations lose the suffix.
    Decrypt { key: Arc<Key>, format: OutputFormat },
    /// Hide the same message in every image; destinations take the format's
    /// extension.
    Hide {
        message: String,
        scheme: StegoScheme,
        format: OutputFormat,
    },
}

impl BatchMode {
    fn name(&self) -> &'static str {
        match self {
            BatchMode::Encrypt { .. } => "encrypt",
            BatchMode::Decrypt { .. } => "decrypt",
            BatchMode::Hide { .. } => "hide",
        }
    }
}

/// Settings shared by every item of a run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub traversal: TraversalPolicy,
    pub overwrite: bool,
    pub encrypted_ext: String,
    /// Maximum number of items in flight. Values below 1 are treated as 1.
    pub max_workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            traversal: TraversalPolicy::RootOnly,
            overwrite: false,
            encrypted_ext: DEFAULT_ENCRYPTED_EXT.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            traversal: TraversalPolicy::from_recursive(config.recursive),
            overwrite: config.overwrite,
            encrypted_ext: config.encrypted_ext.clone(),
            max_workers: config.max_workers,
        }
    }
}

/// Bounded-concurrency directory processor.
pub struct BatchRunner {
    options: BatchOptions,
    observer: Arc<dyn BatchObserver>,
}

impl BatchRunner {
    /// Create a runner that reports through the `log` facade.
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            observer: Arc::new(LogObserver),
        }
    }

    /// Replace the progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Process every qualifying file under `root`, writing results under
    /// `output_root` with the relative layout preserved.
    ///
    /// # Returns
    /// - `Ok(BatchReport)`: one result per discovered item (plus one per
    ///   unreadable entry), whatever the individual outcomes
    /// - `Err`: the root could not be enumerated
    ///
    /// # Example
    /// ```ignore
    /// let runner = BatchRunner::new(BatchOptions::default());
    /// let report = runner
    ///     .run(Path::new("photos"), Path::new("sealed"), BatchMode::Encrypt { key })
    ///     .await?;
    /// println!("{} failed", report.aggregate().failed);
    /// ```
    pub async fn run(&self, root: &Path, output_root: &Path, mode: BatchMode) -> Result<BatchReport> {
        let started = Instant::now();

        let items = self.enumerate(root, output_root, &mode).await?;
        let mut results = items.settled;

        let semaphore = Arc::new(Semaphore::new(self.options.max_workers.max(1)));
        let mode = Arc::new(mode);
        let mut handles = Vec::with_capacity(items.work.len());

        for item in items.work {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PixelLockError::Worker(e.to_string()))?;

            let mode = Arc::clone(&mode);
            let observer = Arc::clone(&self.observer);
            let overwrite = self.options.overwrite;
            let task_item = item.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                observer.item_started(&task_item.source);
                let result = process_item(&task_item, &mode, overwrite);
                observer.item_finished(&result);
                result
            });
            handles.push((item, handle));
        }

        for (item, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let result = BatchResult {
                        source: item.source,
                        destination: item.destination,
                        outcome: ItemOutcome::failed(&PixelLockError::Worker(e.to_string())),
                        elapsed_ms: 0,
                    };
                    self.observer.item_finished(&result);
                    result
                }
            };
            results.push(result);
        }

        let report = BatchReport::new(results, started.elapsed());
        self.observer.batch_finished(&report);
        Ok(report)
    }

    async fn enumerate(&self, root: &Path, output_root: &Path, mode: &BatchMode) -> Result<Enumerated> {
        let selection = match mode {
            BatchMode::Decrypt { .. } => Selection::Suffix(self.options.encrypted_ext.clone()),
            BatchMode::Encrypt { .. } | BatchMode::Hide { .. } => Selection::Images,
        };
        let exclude = walker::nested_exclusion(root, output_root);

        let walk_root = root.to_path_buf();
        let traversal = self.options.traversal;
        let discovery = tokio::task::spawn_blocking(move || {
            walker::discover(&walk_root, traversal, &selection, exclude.as_deref())
        })
        .await
        .map_err(|e| PixelLockError::Worker(e.to_string()))??;

        let mut enumerated = Enumerated::default();

        for (path, reason) in discovery.walk_errors {
            self.observer.walk_error(&path, &reason);
            enumerated.settled.push(walk_failure(path, reason));
        }

        let suffix = self.options.encrypted_ext.as_str();
        let mut claimed = HashSet::new();
        for (source, relative) in discovery.candidates {
            let destination = match mode {
                BatchMode::Encrypt { .. } => {
                    Some(walker::encrypted_destination(output_root, &relative, suffix))
                }
                BatchMode::Decrypt { .. } => {
                    walker::decrypted_destination(output_root, &relative, suffix)
                }
                BatchMode::Hide { format, .. } => Some(walker::replaced_extension_destination(
                    output_root,
                    &relative,
                    format.extension(),
                )),
            };

            let Some(destination) = destination else {
                continue;
            };

            // Several sources can map to one destination (photo.png and
            // photo.jpg under Hide); the first one in walk order keeps it
            if !claimed.insert(destination.clone()) {
                let result = BatchResult {
                    source,
                    destination,
                    outcome: ItemOutcome::Skipped {
                        reason: SkipReason::DuplicateDestination,
                    },
                    elapsed_ms: 0,
                };
                self.observer.item_finished(&result);
                enumerated.settled.push(result);
                continue;
            }

            enumerated.work.push(BatchItem { source, destination });
        }

        log::debug!(
            "🔍 {} {} item(s) under {}",
            mode.name(),
            enumerated.work.len(),
            root.display()
        );
        Ok(enumerated)
    }
}

#[derive(Default)]
struct Enumerated {
    work: Vec<BatchItem>,
    /// Results known before any work runs: walk errors and duplicates
    settled: Vec<BatchResult>,
}

/// Record an unreadable entry below the root as a failed item.
fn walk_failure(path: PathBuf, reason: String) -> BatchResult {
    let error = PixelLockError::Enumeration {
        path: path.clone(),
        reason,
    };
    BatchResult {
        source: path,
        destination: PathBuf::new(),
        outcome: ItemOutcome::failed(&error),
        elapsed_ms: 0,
    }
}

/// Run one item to completion, turning every error into an outcome.
fn process_item(item: &BatchItem, mode: &BatchMode, overwrite: bool) -> BatchResult {
    let started = Instant::now();
    let source = item.source.as_path();
    let destination = item.destination.as_path();

    let outcome = match mode {
        BatchMode::Encrypt { key } => files::encrypt_file(source, destination, key, overwrite),
        BatchMode::Decrypt { key, format } => {
            files::decrypt_file(source, destination, key, *format, overwrite)
        }
        BatchMode::Hide {
            message,
            scheme,
            format,
        } => files::hide_file(source, destination, message, *scheme, *format, overwrite),
    };

    let outcome = match outcome {
        Ok(FileOutcome::Written { bytes }) => ItemOutcome::Succeeded {
            bytes_written: bytes,
        },
        Ok(FileOutcome::Skipped(reason)) => ItemOutcome::Skipped { reason },
        Err(e) => ItemOutcome::failed(&e),
    };

    BatchResult {
        source: item.source.clone(),
        destination: item.destination.clone(),
        outcome,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_failure_is_an_enumeration_failure() {
        let result = walk_failure(PathBuf::from("in/locked"), "permission denied".to_string());
        assert_eq!(result.source, PathBuf::from("in/locked"));
        match result.outcome {
            ItemOutcome::Failed { kind, error } => {
                assert_eq!(kind, "enumeration");
                assert!(error.contains("in/locked"));
                assert!(error.contains("permission denied"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_options_from_config() {
        let config = BatchConfig {
            max_workers: 9,
            encrypted_ext: ".xyz".to_string(),
            recursive: true,
            overwrite: true,
        };
        let options = BatchOptions::from(&config);
        assert_eq!(options.traversal, TraversalPolicy::Unlimited);
        assert_eq!(options.max_workers, 9);
        assert_eq!(options.encrypted_ext, ".xyz");
        assert!(options.overwrite);
    }
}
