// src/reconciliation/mod.rs
//! Employment history reconciliation: turns noisy scraped experience records
//! into one overlap-aware tenure total.

pub mod classifier;
pub mod deduplicator;
pub mod duration_parser;
pub mod orchestrator;
pub mod overrides;
pub mod timeline;

pub use classifier::{ClassificationRule, Classifier};
pub use deduplicator::{DedupOutcome, Deduplicator};
pub use duration_parser::DurationParser;
pub use orchestrator::Reconciler;
pub use overrides::{OverrideRecord, OverrideRegistry};
pub use timeline::{MergeSummary, Timeline, TimelineMerger};
