//! # Batch Processing
//!
//! Directory fan-out for the engines:
//!
//! - [`walker`]: discovery, traversal policy, destination mapping
//! - [`runner`]: bounded-concurrency execution with per-item isolation
//! - [`report`]: per-item results and aggregated statistics
//! - [`observer`]: progress reporting hooks

pub mod observer;
pub mod report;
pub mod runner;
pub mod walker;

pub use observer::{BatchObserver, LogObserver, SilentObserver};
pub use report::{BatchReport, BatchResult, BatchStats, ItemOutcome};
pub use runner::{BatchMode, BatchOptions, BatchRunner};
pub use walker::TraversalPolicy;
