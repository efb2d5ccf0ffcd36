// src/types/response.rs
use serde::Serialize;

use crate::reconciliation::overrides::OverrideRecord;
use crate::types::experience::{DurationConflict, EntryVariant};

// ===== Reconciliation Result =====

/// Final tenure for one profile plus the breakdown that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub total_months: u32,
    pub total_years: u32,
    pub skipped_count: usize,
    pub overlap_months: u32,
    pub override_applied: Option<OverrideRecord>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub profile_id: String,
    /// Months computed by the pipeline before clamping or override.
    pub computed_months: u32,
    pub computed_years: u32,
    /// `computed_years` exceeded the ceiling and was clamped.
    pub clamped: bool,
    pub safety_valve_fired: bool,
    pub dated_entry_count: usize,
    pub undated_months_raw: u32,
    pub undated_months_added: u32,
    pub undated_discount_applied: bool,
    pub conflict_count: usize,
    pub entries: Vec<EntryDiagnostic>,
    /// Populated only when tracing is enabled in the engine config.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryDiagnostic {
    pub index: usize,
    pub title: String,
    pub company: String,
    pub variant: EntryVariant,
    pub confidence: f64,
    pub rule: Option<&'static str>,
    pub months: Option<u32>,
    pub conflict: Option<DurationConflict>,
    pub outlier: bool,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum EntryStatus {
    Counted,
    Dropped(DropReason),
    Excluded(ExclusionReason),
}

/// Why the deduplicator removed an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Title equals company.
    SelfReferential,
    /// Rollup for an employer whose individual roles are present.
    RollupSuperseded,
    /// Keywordless entry whose duration dwarfs its employer group.
    OutlierDuration,
}

/// Why a kept entry still contributes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    UnknownVariant,
    GroupedHeader,
    Unparseable,
}

// ===== Trace Channel =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classify,
    Deduplicate,
    Parse,
    Merge,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    pub stage: Stage,
    pub message: String,
}
