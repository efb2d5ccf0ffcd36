// src/reconciliation/timeline.rs
//! Month-granularity occupancy timeline and overlap-aware totals

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::EngineConfig;
use crate::types::experience::{ResolvedEntry, YearMonth};

/// Occupied months keyed by calendar month, each holding the indices of the
/// entries active that month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    months: BTreeMap<YearMonth, BTreeSet<usize>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every month from `start` to `end` inclusive as occupied by `index`.
    pub fn mark(&mut self, index: usize, start: YearMonth, end: YearMonth) {
        for month in start.iter_through(end) {
            self.months.entry(month).or_default().insert(index);
        }
    }

    pub fn distinct_months(&self) -> u32 {
        self.months.len() as u32
    }

    /// Months occupied by more than one entry. Informational only.
    pub fn overlap_months(&self) -> u32 {
        self.months.values().filter(|set| set.len() > 1).count() as u32
    }

    pub fn occupants(&self, month: &YearMonth) -> Option<&BTreeSet<usize>> {
        self.months.get(month)
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    pub total_months: u32,
    pub overlap_months: u32,
    pub dated_months: u32,
    pub dated_entry_count: usize,
    pub undated_months_raw: u32,
    pub undated_months_added: u32,
    pub undated_discount_applied: bool,
    pub timeline: Timeline,
}

#[derive(Debug, Clone)]
pub struct TimelineMerger {
    undated_overlap_factor: f64,
    undated_discount_threshold: usize,
}

impl Default for TimelineMerger {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl TimelineMerger {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            undated_overlap_factor: config.undated_overlap_factor,
            undated_discount_threshold: config.undated_discount_threshold,
        }
    }

    /// Dated entries collapse into distinct months; undated month counts are
    /// added on top, discounted once more than `undated_discount_threshold`
    /// dated entries exist since they likely overlap those.
    pub fn merge(&self, entries: &[ResolvedEntry]) -> MergeSummary {
        let mut timeline = Timeline::new();
        let mut dated_entry_count = 0;
        let mut undated_months_raw: u32 = 0;

        for resolved in entries {
            match resolved.interval.resolved_range() {
                Some((start, end)) => {
                    timeline.mark(resolved.index(), start, end);
                    dated_entry_count += 1;
                }
                None => {
                    undated_months_raw += resolved.interval.month_count().unwrap_or(0);
                }
            }
        }

        let dated_months = timeline.distinct_months();
        let overlap_months = timeline.overlap_months();

        let undated_discount_applied =
            dated_entry_count > 0 && dated_entry_count > self.undated_discount_threshold;
        let undated_months_added = if undated_discount_applied {
            (undated_months_raw as f64 * self.undated_overlap_factor).round() as u32
        } else {
            undated_months_raw
        };

        debug!(
            "Timeline: {} dated entries over {} distinct months ({} overlapping), {} undated months -> {}",
            dated_entry_count, dated_months, overlap_months, undated_months_raw, undated_months_added
        );

        MergeSummary {
            total_months: dated_months + undated_months_added,
            overlap_months,
            dated_months,
            dated_entry_count,
            undated_months_raw,
            undated_months_added,
            undated_discount_applied,
            timeline,
        }
    }
}
