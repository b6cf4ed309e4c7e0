use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PixelLockError;
use crate::files::SkipReason;

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded { bytes_written: u64 },
    Skipped { reason: SkipReason },
    Failed { kind: String, error: String },
}

impl ItemOutcome {
    pub fn failed(err: &PixelLockError) -> Self {
        ItemOutcome::Failed {
            kind: err.kind().to_string(),
            error: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }
}

/// One source/destination pair and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: ItemOutcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_written: u64,

    // Failure kinds breakdown
    pub failure_kinds: HashMap<String, usize>,
}

/// Every item result of a batch run, sorted by source path.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<BatchResult>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn new(mut results: Vec<BatchResult>, elapsed: Duration) -> Self {
        results.sort_by(|a, b| a.source.cmp(&b.source));
        Self { results, elapsed }
    }

    pub fn aggregate(&self) -> BatchStats {
        let mut stats = BatchStats {
            total: self.results.len(),
            ..Default::default()
        };

        for result in &self.results {
            match &result.outcome {
                ItemOutcome::Succeeded { bytes_written } => {
                    stats.succeeded += 1;
                    stats.bytes_written += bytes_written;
                }
                ItemOutcome::Skipped { .. } => stats.skipped += 1,
                ItemOutcome::Failed { kind, .. } => {
                    stats.failed += 1;
                    *stats.failure_kinds.entry(kind.clone()).or_insert(0) += 1;
                }
            }
        }

        stats
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed { .. }))
    }

    pub fn export_to_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        // Non-UTF-8 paths cannot be represented in JSON
        let results = serde_json::to_value(&self.results)?;
        let output = serde_json::json!({
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "aggregated_stats": self.aggregate(),
            "results": results,
        });

        let json_string = serde_json::to_string_pretty(&output)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;

    fn result(name: &str, outcome: ItemOutcome) -> BatchResult {
        BatchResult {
            source: PathBuf::from(name),
            destination: PathBuf::from(format!("out/{}", name)),
            outcome,
            elapsed_ms: 1,
        }
    }

    #[test]
    fn test_report_aggregation() {
        let auth: PixelLockError = CryptoError::AuthenticationFailed.into();
        let report = BatchReport::new(
            vec![
                result("c.png", ItemOutcome::Succeeded { bytes_written: 100 }),
                result("a.png", ItemOutcome::Succeeded { bytes_written: 50 }),
                result(
                    "b.png",
                    ItemOutcome::Skipped {
                        reason: SkipReason::AlreadyExists,
                    },
                ),
                result("d.png", ItemOutcome::failed(&auth)),
            ],
            Duration::from_millis(10),
        );

        let stats = report.aggregate();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.bytes_written, 150);
        assert_eq!(stats.failure_kinds.get("crypto"), Some(&1));

        // Sorted by source
        assert_eq!(report.results[0].source, PathBuf::from("a.png"));
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_export_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = BatchReport::new(
            vec![result("a.png", ItemOutcome::Succeeded { bytes_written: 7 })],
            Duration::from_millis(3),
        );
        report.export_to_json(&path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["aggregated_stats"]["succeeded"], 1);
        assert_eq!(parsed["results"][0]["outcome"]["status"], "succeeded");
        assert_eq!(parsed["results"][0]["outcome"]["bytes_written"], 7);
    }
}
