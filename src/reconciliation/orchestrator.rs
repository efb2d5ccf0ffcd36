// src/reconciliation/orchestrator.rs
//! One reconciliation call: classify, deduplicate, parse, merge, finalize.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use super::classifier::Classifier;
use super::deduplicator::Deduplicator;
use super::duration_parser::DurationParser;
use super::overrides::OverrideRegistry;
use super::timeline::TimelineMerger;
use crate::config::EngineConfig;
use crate::types::experience::{
    ClassifiedEntry, EntryVariant, ParsedInterval, RawExperienceEntry, ResolvedEntry,
};
use crate::types::response::{
    Diagnostics, EntryDiagnostic, EntryStatus, ExclusionReason, ReconciliationResult, Stage,
    TraceEvent,
};
use crate::utils::profile_id_from_url;

/// Collects `TraceEvent`s when enabled; every event is also logged at debug.
struct Trace {
    enabled: bool,
    events: Vec<TraceEvent>,
}

impl Trace {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    fn record(&mut self, stage: Stage, message: impl FnOnce() -> String) {
        let message = message();
        debug!(?stage, "{}", message);
        if self.enabled {
            self.events.push(TraceEvent { stage, message });
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    config: EngineConfig,
    classifier: Classifier,
    overrides: OverrideRegistry,
}

impl Reconciler {
    pub fn new(config: EngineConfig, overrides: OverrideRegistry) -> Self {
        Self {
            config,
            classifier: Classifier::default(),
            overrides,
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn overrides(&self) -> &OverrideRegistry {
        &self.overrides
    }

    /// Reconcile entries scraped from a profile URL, keying overrides by the
    /// id extracted from it.
    pub fn reconcile_url(&self, raw_entries: &[RawExperienceEntry], url: &str) -> ReconciliationResult {
        self.reconcile(raw_entries, &profile_id_from_url(url))
    }

    pub fn reconcile(&self, raw_entries: &[RawExperienceEntry], profile_id: &str) -> ReconciliationResult {
        let mut trace = Trace::new(self.config.trace);
        let parser = DurationParser::from_config(&self.config, self.config.reference_month());

        trace.record(Stage::Classify, || {
            format!(
                "{} raw entries for '{}', open ranges end {}",
                raw_entries.len(),
                profile_id,
                parser.today()
            )
        });

        let classified = self.classifier.classify_all(raw_entries);
        for entry in &classified {
            trace.record(Stage::Classify, || {
                format!(
                    "#{} '{}' @ '{}' -> {} ({:.2})",
                    entry.index, entry.entry.title, entry.entry.company, entry.variant, entry.confidence
                )
            });
        }

        let dedup = Deduplicator::new(&self.config, parser.clone()).reconcile(classified.clone());
        if dedup.safety_valve_fired {
            warn!(
                "Safety valve fired for '{}': every entry failed validation",
                profile_id
            );
        }
        trace.record(Stage::Deduplicate, || {
            format!(
                "kept {:?}, dropped {:?}, outliers {:?}, safety valve {}",
                dedup.kept.iter().map(|e| e.index).collect::<Vec<_>>(),
                dedup
                    .dropped
                    .iter()
                    .map(|d| (d.entry.index, d.reason))
                    .collect::<Vec<_>>(),
                dedup.outliers,
                dedup.safety_valve_fired
            )
        });

        let mut statuses: HashMap<usize, EntryStatus> = dedup
            .dropped
            .iter()
            .map(|d| (d.entry.index, EntryStatus::Dropped(d.reason)))
            .collect();

        let mut resolved = Vec::new();
        for entry in dedup.kept {
            let status = match entry.variant {
                EntryVariant::Unknown => EntryStatus::Excluded(ExclusionReason::UnknownVariant),
                EntryVariant::GroupedHeader => EntryStatus::Excluded(ExclusionReason::GroupedHeader),
                EntryVariant::IndividualRole | EntryVariant::EmployerRollup => {
                    let interval = parser.parse(entry.entry.duration_text());
                    if interval.is_unparseable() {
                        EntryStatus::Excluded(ExclusionReason::Unparseable)
                    } else {
                        trace.record(Stage::Parse, || {
                            format!(
                                "#{} '{}' -> {:?} mos, range {:?}",
                                entry.index,
                                entry.entry.duration_text(),
                                interval.months,
                                interval.resolved_range()
                            )
                        });
                        statuses.insert(entry.index, EntryStatus::Counted);
                        resolved.push(ResolvedEntry {
                            classified: entry,
                            interval,
                        });
                        continue;
                    }
                }
            };
            statuses.insert(entry.index, status);
        }

        let conflict_count = resolved
            .iter()
            .filter(|r| r.interval.conflict.is_some())
            .count();
        if conflict_count > 0 {
            warn!(
                "{} entries for '{}' had explicit durations overriding their date ranges",
                conflict_count, profile_id
            );
        }

        let summary = TimelineMerger::new(&self.config).merge(&resolved);
        trace.record(Stage::Merge, || {
            format!(
                "{} dated months ({} overlapping) + {} undated months (raw {}, discounted {})",
                summary.dated_months,
                summary.overlap_months,
                summary.undated_months_added,
                summary.undated_months_raw,
                summary.undated_discount_applied
            )
        });

        let computed_months = summary.total_months;
        let computed_years = months_to_years(computed_months);
        let mut total_months = computed_months;
        let mut total_years = computed_years;

        let clamped = computed_years > self.config.max_total_years;
        if clamped {
            warn!(
                "Computed {} years for '{}' exceeds the {}-year ceiling, clamping",
                computed_years, profile_id, self.config.max_total_years
            );
            total_years = self.config.max_total_years;
            total_months = total_years * 12;
        }

        let override_applied = self.overrides.lookup(profile_id).cloned();
        if let Some(record) = &override_applied {
            info!(
                "Override for '{}': {} years replaces computed {} ({})",
                profile_id, record.years, total_years, record.reason
            );
            total_years = record.years;
            total_months = record.years * 12;
        }

        trace.record(Stage::Finalize, || {
            format!(
                "computed {} mos / {} yrs, clamped {}, override {:?} -> {} yrs",
                computed_months,
                computed_years,
                clamped,
                override_applied.as_ref().map(|r| r.years),
                total_years
            )
        });

        let entries = entry_diagnostics(&classified, &resolved, &statuses, &dedup.outliers, &parser);
        let counted = resolved.len();

        info!(
            "Reconciled '{}': {} entries, {} counted, {} months ({} years)",
            profile_id,
            raw_entries.len(),
            counted,
            total_months,
            total_years
        );

        ReconciliationResult {
            total_months,
            total_years,
            skipped_count: raw_entries.len() - counted,
            overlap_months: summary.overlap_months,
            override_applied,
            diagnostics: Diagnostics {
                profile_id: profile_id.to_string(),
                computed_months,
                computed_years,
                clamped,
                safety_valve_fired: dedup.safety_valve_fired,
                dated_entry_count: summary.dated_entry_count,
                undated_months_raw: summary.undated_months_raw,
                undated_months_added: summary.undated_months_added,
                undated_discount_applied: summary.undated_discount_applied,
                conflict_count,
                entries,
                trace: trace.events,
            },
        }
    }
}

fn months_to_years(months: u32) -> u32 {
    (months as f64 / 12.0).round() as u32
}

fn entry_diagnostics(
    classified: &[ClassifiedEntry],
    resolved: &[ResolvedEntry],
    statuses: &HashMap<usize, EntryStatus>,
    outliers: &BTreeSet<usize>,
    parser: &DurationParser,
) -> Vec<EntryDiagnostic> {
    let intervals: HashMap<usize, &ParsedInterval> =
        resolved.iter().map(|r| (r.index(), &r.interval)).collect();

    classified
        .iter()
        .map(|entry| {
            let interval = match intervals.get(&entry.index) {
                Some(interval) => (*interval).clone(),
                None => parser.parse(entry.entry.duration_text()),
            };

            EntryDiagnostic {
                index: entry.index,
                title: entry.entry.title.clone(),
                company: entry.entry.company.clone(),
                variant: entry.variant,
                confidence: entry.confidence,
                rule: entry.rule,
                months: interval.month_count(),
                conflict: interval.conflict,
                outlier: outliers.contains(&entry.index),
                status: statuses
                    .get(&entry.index)
                    .copied()
                    .unwrap_or(EntryStatus::Excluded(ExclusionReason::Unparseable)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::classifier::ClassificationRule;
    use crate::reconciliation::overrides::OverrideRecord;
    use crate::types::response::DropReason;
    use chrono::NaiveDate;

    fn reconciler() -> Reconciler {
        let config = EngineConfig::default().with_as_of(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        Reconciler::new(config, OverrideRegistry::empty())
    }

    fn entry(title: &str, company: &str, duration: &str) -> RawExperienceEntry {
        RawExperienceEntry::new(title, company, duration)
    }

    #[test]
    fn test_rollup_suppressed_in_favour_of_roles() {
        let entries = vec![
            entry("Acme", "Acme", "14 yrs 7 mos"),
            entry("Manager", "Acme", "3 yrs"),
            entry("Analyst", "Acme", "4 yrs"),
        ];
        let result = reconciler().reconcile(&entries, "jane");

        assert_eq!(result.total_months, 84);
        assert_eq!(result.total_years, 7);
        assert_eq!(result.skipped_count, 1);
        assert!(matches!(
            result.diagnostics.entries[0].status,
            EntryStatus::Dropped(DropReason::SelfReferential)
        ));
    }

    #[test]
    fn test_explicit_duration_counted_over_range() {
        let entries = vec![entry("Engineer", "Acme", "Jan 2019 - Mar 2019 · 3 yrs 2 mos")];
        let result = reconciler().reconcile(&entries, "jane");

        assert_eq!(result.total_months, 38);
        assert_eq!(result.diagnostics.conflict_count, 1);
        assert!(result.diagnostics.entries[0].conflict.is_some());
    }

    #[test]
    fn test_overlapping_roles_counted_once() {
        let entries = vec![
            entry("Engineer", "Acme", "Jan 2018 - Dec 2019"),
            entry("Consultant", "Globex", "Jun 2019 - Jun 2020"),
        ];
        let result = reconciler().reconcile(&entries, "jane");

        assert_eq!(result.total_months, 30);
        assert_eq!(result.overlap_months, 7);
        assert_eq!(result.total_years, 3);
    }

    #[test]
    fn test_unknown_and_unparseable_entries_are_skipped() {
        let entries = vec![
            entry("Engineer", "Acme", "2 yrs"),
            entry("Globex", "Initech", "Jan 2019 - Mar 2020"),
            entry("Engineer", "Hooli", "sometime"),
        ];
        let result = reconciler().reconcile(&entries, "jane");

        assert_eq!(result.total_months, 24);
        assert_eq!(result.skipped_count, 2);
        assert_eq!(
            result.diagnostics.entries[1].status,
            EntryStatus::Excluded(ExclusionReason::UnknownVariant)
        );
        assert_eq!(
            result.diagnostics.entries[2].status,
            EntryStatus::Excluded(ExclusionReason::Unparseable)
        );
    }

    #[test]
    fn test_clamp_above_ceiling() {
        let entries = vec![
            entry("Engineer", "Acme", "25 yrs"),
            entry("Director", "Globex", "24 yrs"),
        ];
        let result = reconciler().reconcile(&entries, "jane");

        assert_eq!(result.total_years, 40);
        assert_eq!(result.total_months, 480);
        assert!(result.diagnostics.clamped);
        assert_eq!(result.diagnostics.computed_years, 49);
    }

    #[test]
    fn test_override_replaces_total_and_keeps_computed() {
        let overrides =
            OverrideRegistry::from_records(vec![OverrideRecord::new("jane-doe-42", 15, "manual")])
                .unwrap();
        let reconciler = Reconciler::new(reconciler().config().clone(), overrides);

        let entries = vec![entry("Engineer", "Acme", "3 yrs")];
        let result = reconciler.reconcile_url(&entries, "https://www.linkedin.com/in/jane-doe-42/");

        assert_eq!(result.total_years, 15);
        assert_eq!(result.diagnostics.computed_years, 3);
        assert_eq!(result.diagnostics.computed_months, 36);
        assert_eq!(result.override_applied.map(|r| r.years), Some(15));
    }

    #[test]
    fn test_grouped_header_is_excluded() {
        let entries = vec![
            entry("Acme", "Acme", "").as_group_header(),
            entry("Engineer", "Acme", "Jan 2020 - Dec 2020"),
        ];
        let result = reconciler().reconcile(&entries, "jane");

        assert_eq!(result.total_months, 12);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.diagnostics.entries[0].variant, EntryVariant::GroupedHeader);
    }

    #[test]
    fn test_trace_channel_only_when_enabled() {
        let entries = vec![entry("Engineer", "Acme", "3 yrs")];

        let quiet = reconciler().reconcile(&entries, "jane");
        assert!(quiet.diagnostics.trace.is_empty());

        let config = reconciler().config().clone().with_trace(true);
        let traced = Reconciler::new(config, OverrideRegistry::empty()).reconcile(&entries, "jane");
        assert!(traced
            .diagnostics
            .trace
            .iter()
            .any(|event| event.stage == Stage::Finalize));
        assert_eq!(traced.total_months, quiet.total_months);
    }

    #[test]
    fn test_mixed_case_profile_id_finds_override() {
        let overrides =
            OverrideRegistry::from_records(vec![OverrideRecord::new("Jane-Doe", 15, "manual")])
                .unwrap();
        let reconciler = Reconciler::new(reconciler().config().clone(), overrides);

        let result = reconciler.reconcile(&[entry("Engineer", "Acme", "3 yrs")], "Jane-Doe");

        assert_eq!(result.total_years, 15);
        assert_eq!(result.diagnostics.computed_years, 3);
    }

    #[test]
    fn test_rollup_with_employment_type_company_not_double_counted() {
        let entries = vec![
            entry("Acme", "Full-time · 14 yrs 7 mos", ""),
            entry("Manager", "Acme", "3 yrs"),
            entry("Analyst", "Acme", "4 yrs"),
        ];
        let result = reconciler().reconcile(&entries, "jane");

        assert_eq!(result.total_months, 84);
        assert_eq!(result.total_years, 7);
        assert_eq!(
            result.diagnostics.entries[0].status,
            EntryStatus::Dropped(DropReason::RollupSuperseded)
        );
    }

    #[test]
    fn test_entry_months_match_placed_span() {
        let entries = vec![entry("Engineer", "Acme", "Jan 2019 - Dec 2019 · 1 yr 6 mos")];
        let result = reconciler().reconcile(&entries, "jane");

        assert_eq!(result.total_months, 12);
        assert_eq!(result.diagnostics.entries[0].months, Some(12));
        assert!(result.diagnostics.entries[0].conflict.is_none());
    }

    #[test]
    fn test_custom_rule_flows_through_reconcile() {
        fn career_break(entry: &RawExperienceEntry, _: &[&RawExperienceEntry]) -> bool {
            entry.title.trim().eq_ignore_ascii_case("sabbatical")
        }

        let entries = vec![
            entry("Engineer", "Acme", "Jan 2020 - Dec 2020"),
            entry("Sabbatical", "Self", "Jan 2021 - Dec 2021"),
        ];

        let default = reconciler().reconcile(&entries, "jane");
        assert_eq!(default.total_months, 12);
        assert_eq!(default.diagnostics.entries[1].variant, EntryVariant::Unknown);

        let classifier = Classifier::default().with_rule(ClassificationRule {
            name: "career_break",
            variant: EntryVariant::IndividualRole,
            confidence: 0.6,
            predicate: career_break,
        });
        let custom = reconciler().with_classifier(classifier).reconcile(&entries, "jane");

        assert_eq!(custom.total_months, 24);
        assert_eq!(custom.skipped_count, 0);
        assert_eq!(custom.diagnostics.entries[1].rule, Some("career_break"));
        assert_eq!(custom.diagnostics.entries[1].status, EntryStatus::Counted);
    }

    #[test]
    fn test_empty_input() {
        let result = reconciler().reconcile(&[], "any-id");
        assert_eq!(result.total_months, 0);
        assert_eq!(result.total_years, 0);
        assert_eq!(result.skipped_count, 0);
        assert!(result.override_applied.is_none());
    }

    #[test]
    fn test_months_to_years_rounds_half_up() {
        assert_eq!(months_to_years(0), 0);
        assert_eq!(months_to_years(5), 0);
        assert_eq!(months_to_years(6), 1);
        assert_eq!(months_to_years(90), 8);
    }
}
