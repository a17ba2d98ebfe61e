//! Application layer - use cases and services

pub mod analyzer;
pub mod commands;
pub mod ingestion;
pub mod restore;
pub mod tracker;

pub use analyzer::TradeAnalyzer;
pub use commands::{Command, CommandExecutor};
pub use ingestion::{AddressWatcher, ClosedStream, IngestPipeline, IngestReport, Recipients, TradeIngestor};
pub use restore::{RestorationOrchestrator, RestoreStats};
pub use tracker::{TrackOutcome, TrackRequest, TrackedStatus, TrackingService, UntrackOutcome};
