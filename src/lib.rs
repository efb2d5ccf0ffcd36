// src/lib.rs
pub mod cli;
pub mod config;
pub mod core;
pub mod reconciliation;
pub mod types;
pub mod utils;

pub use config::EngineConfig;
pub use reconciliation::{OverrideRecord, OverrideRegistry, Reconciler};
pub use types::{RawExperienceEntry, ReconciliationResult};

/// Convenience function for a one-off reconciliation with default heuristics
pub fn reconcile(
    entries: &[RawExperienceEntry],
    profile_id: &str,
    overrides: &OverrideRegistry,
) -> ReconciliationResult {
    Reconciler::new(EngineConfig::default(), overrides.clone()).reconcile(entries, profile_id)
}
