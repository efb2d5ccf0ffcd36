// src/reconciliation/deduplicator.rs
//! Removes rollups and self-referential records that would double count an
//! employer already covered by its individual roles.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use super::duration_parser::DurationParser;
use crate::config::EngineConfig;
use crate::types::experience::{ClassifiedEntry, EntryVariant};
use crate::types::response::DropReason;
use crate::utils::{has_job_title_keyword, normalize_employer};

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedEntry {
    pub entry: ClassifiedEntry,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    pub kept: Vec<ClassifiedEntry>,
    pub dropped: Vec<DroppedEntry>,
    /// Entry indices whose duration exceeded the outlier ratio, dropped or not.
    pub outliers: BTreeSet<usize>,
    pub safety_valve_fired: bool,
}

#[derive(Debug, Clone)]
pub struct Deduplicator {
    parser: DurationParser,
    outlier_ratio: f64,
    outlier_min_group: usize,
    safety_valve_prefix: usize,
}

impl Deduplicator {
    pub fn new(config: &EngineConfig, parser: DurationParser) -> Self {
        Self {
            parser,
            outlier_ratio: config.outlier_ratio,
            outlier_min_group: config.outlier_min_group,
            safety_valve_prefix: config.safety_valve_prefix,
        }
    }

    pub fn reconcile(&self, entries: Vec<ClassifiedEntry>) -> DedupOutcome {
        let mut drops: HashMap<usize, DropReason> = HashMap::new();
        let mut outliers = BTreeSet::new();

        for entry in &entries {
            let title = entry.entry.title.trim();
            if !title.is_empty() && title == entry.entry.company.trim() {
                drops.insert(entry.index, DropReason::SelfReferential);
            }
        }

        for (employer, members) in group_by_employer(&entries) {
            let has_role = members
                .iter()
                .any(|e| e.variant == EntryVariant::IndividualRole);
            let has_rollup = members
                .iter()
                .any(|e| e.variant == EntryVariant::EmployerRollup);

            if has_role && has_rollup {
                for rollup in members
                    .iter()
                    .filter(|e| e.variant == EntryVariant::EmployerRollup)
                {
                    debug!("Dropping rollup #{} for '{}'", rollup.index, employer);
                    drops.entry(rollup.index).or_insert(DropReason::RollupSuperseded);
                }
            }

            let remaining: Vec<&ClassifiedEntry> = members
                .into_iter()
                .filter(|e| !drops.contains_key(&e.index))
                .collect();
            for (index, droppable) in self.duration_outliers(&remaining) {
                outliers.insert(index);
                if droppable {
                    debug!("Dropping outlier #{} for '{}'", index, employer);
                    drops.entry(index).or_insert(DropReason::OutlierDuration);
                }
            }
        }

        let total = entries.len();
        let (kept, dropped): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| !drops.contains_key(&e.index));

        let dropped: Vec<DroppedEntry> = dropped
            .into_iter()
            .filter_map(|entry| {
                drops.get(&entry.index).map(|reason| DroppedEntry {
                    reason: *reason,
                    entry,
                })
            })
            .collect();

        if total > 0 && kept.is_empty() {
            return self.safety_valve(dropped, outliers);
        }

        DedupOutcome {
            kept,
            dropped,
            outliers,
            safety_valve_fired: false,
        }
    }

    /// Validation would leave nothing: restore a prefix of the input instead.
    fn safety_valve(&self, dropped: Vec<DroppedEntry>, outliers: BTreeSet<usize>) -> DedupOutcome {
        warn!(
            "Validation discarded all {} entries, restoring the first {}",
            dropped.len(),
            self.safety_valve_prefix.min(dropped.len())
        );

        let mut dropped = dropped;
        dropped.sort_by_key(|d| d.entry.index);
        let beyond = dropped.split_off(self.safety_valve_prefix.min(dropped.len()));

        DedupOutcome {
            kept: dropped.into_iter().map(|d| d.entry).collect(),
            dropped: beyond,
            outliers,
            safety_valve_fired: true,
        }
    }

    /// Heuristic: in a group of `outlier_min_group`+ entries, a duration over
    /// `outlier_ratio` times the group average is probably an undetected rollup.
    /// Returns `(index, droppable)`; only keywordless titles are droppable.
    fn duration_outliers(&self, members: &[&ClassifiedEntry]) -> Vec<(usize, bool)> {
        if members.len() < self.outlier_min_group {
            return Vec::new();
        }

        let durations: Vec<(&ClassifiedEntry, u32)> = members
            .iter()
            .filter_map(|e| {
                self.parser
                    .parse(e.entry.duration_text())
                    .month_count()
                    .map(|months| (*e, months))
            })
            .collect();
        if durations.is_empty() {
            return Vec::new();
        }

        let average =
            durations.iter().map(|(_, m)| *m as f64).sum::<f64>() / durations.len() as f64;
        let threshold = average * self.outlier_ratio;

        durations
            .into_iter()
            .filter(|(_, months)| *months as f64 > threshold)
            .map(|(e, _)| (e.index, !has_job_title_keyword(&e.entry.title)))
            .collect()
    }
}

/// Entries grouped by normalised employer, in first-seen order. Entries with
/// no employer are left ungrouped.
/// A rollup whose company field is only an employment type and a duration
/// ("Full-time · 14 yrs") names its employer in the title instead.
fn employer_key(entry: &ClassifiedEntry) -> String {
    let employer = normalize_employer(&entry.entry.company);
    if employer.is_empty() && entry.variant == EntryVariant::EmployerRollup {
        return normalize_employer(&entry.entry.title);
    }
    employer
}

fn group_by_employer(entries: &[ClassifiedEntry]) -> Vec<(String, Vec<&ClassifiedEntry>)> {
    let mut groups: Vec<(String, Vec<&ClassifiedEntry>)> = Vec::new();

    for entry in entries {
        let employer = employer_key(entry);
        if employer.is_empty() {
            continue;
        }
        match groups.iter_mut().find(|(key, _)| *key == employer) {
            Some((_, members)) => members.push(entry),
            None => groups.push((employer, vec![entry])),
        }
    }

    groups
}
