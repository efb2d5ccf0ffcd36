// src/reconciliation/classifier.rs
//! Rule-table classifier for raw experience records.
//!
//! Rules are evaluated in table order and the first match wins, so the table
//! order is the precedence: rollup rules, then individual roles, then grouped
//! headers. Nothing matching leaves the entry `Unknown`.

use tracing::debug;

use super::duration_parser::{has_duration_signal, is_bare_duration, leading_tokens_have_duration};
use crate::types::experience::{ClassifiedEntry, EntryVariant, RawExperienceEntry};
use crate::utils::{has_embedded_duration, has_job_title_keyword, looks_like_org_name, normalize_employer};

pub type RulePredicate = fn(&RawExperienceEntry, &[&RawExperienceEntry]) -> bool;

#[derive(Clone)]
pub struct ClassificationRule {
    pub name: &'static str,
    pub variant: EntryVariant,
    pub confidence: f64,
    pub predicate: RulePredicate,
}

impl std::fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRule")
            .field("name", &self.name)
            .field("variant", &self.variant)
            .field("confidence", &self.confidence)
            .finish()
    }
}

pub const ROLLUP_CONFIDENCE: f64 = 0.9;
pub const ROLE_CONFIDENCE: f64 = 0.85;
pub const GROUPED_HEADER_CONFIDENCE: f64 = 0.7;

// ===== Rule Predicates =====

fn company_embeds_duration(entry: &RawExperienceEntry, _: &[&RawExperienceEntry]) -> bool {
    has_embedded_duration(&entry.company)
}

fn org_title_with_bare_duration(entry: &RawExperienceEntry, _: &[&RawExperienceEntry]) -> bool {
    looks_like_org_name(&entry.title) && is_bare_duration(entry.duration_text())
}

fn org_title_repeats_company(entry: &RawExperienceEntry, _: &[&RawExperienceEntry]) -> bool {
    let employer = normalize_employer(&entry.company);
    looks_like_org_name(&entry.title)
        && !employer.is_empty()
        && normalize_employer(&entry.title) == employer
        && has_duration_signal(entry.duration_text())
}

/// A sibling at the same employer that is nothing but a duration line, e.g.
/// `{title: "", company: "Acme", duration: "Full-time · 14 yrs"}`.
fn org_title_with_sibling_duration_line(
    entry: &RawExperienceEntry,
    siblings: &[&RawExperienceEntry],
) -> bool {
    if !looks_like_org_name(&entry.title) {
        return false;
    }
    let employer = normalize_employer(&entry.company);
    if employer.is_empty() {
        return false;
    }

    siblings.iter().any(|sibling| {
        let title = sibling.title.trim();
        let untitled = title.is_empty() || is_bare_duration(title);
        untitled
            && normalize_employer(&sibling.company) == employer
            && (is_bare_duration(title) || is_bare_duration(sibling.duration_text()))
    })
}

fn title_has_job_keyword(entry: &RawExperienceEntry, _: &[&RawExperienceEntry]) -> bool {
    has_job_title_keyword(&entry.title)
}

fn structural_group_header(entry: &RawExperienceEntry, _: &[&RawExperienceEntry]) -> bool {
    entry.is_group_header && !leading_tokens_have_duration(&entry.duration)
}

pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule {
            name: "rollup_company_embeds_duration",
            variant: EntryVariant::EmployerRollup,
            confidence: ROLLUP_CONFIDENCE,
            predicate: company_embeds_duration,
        },
        ClassificationRule {
            name: "rollup_org_title_bare_duration",
            variant: EntryVariant::EmployerRollup,
            confidence: ROLLUP_CONFIDENCE,
            predicate: org_title_with_bare_duration,
        },
        ClassificationRule {
            name: "rollup_org_title_repeats_company",
            variant: EntryVariant::EmployerRollup,
            confidence: ROLLUP_CONFIDENCE,
            predicate: org_title_repeats_company,
        },
        ClassificationRule {
            name: "rollup_sibling_duration_line",
            variant: EntryVariant::EmployerRollup,
            confidence: ROLLUP_CONFIDENCE,
            predicate: org_title_with_sibling_duration_line,
        },
        ClassificationRule {
            name: "role_title_keyword",
            variant: EntryVariant::IndividualRole,
            confidence: ROLE_CONFIDENCE,
            predicate: title_has_job_keyword,
        },
        ClassificationRule {
            name: "grouped_header_structural",
            variant: EntryVariant::GroupedHeader,
            confidence: GROUPED_HEADER_CONFIDENCE,
            predicate: structural_group_header,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl Classifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Append a rule at the lowest precedence.
    pub fn with_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn classify(
        &self,
        index: usize,
        entry: &RawExperienceEntry,
        siblings: &[&RawExperienceEntry],
    ) -> ClassifiedEntry {
        let matched = self
            .rules
            .iter()
            .find(|rule| (rule.predicate)(entry, siblings));

        let (variant, confidence, rule) = match matched {
            Some(rule) => (rule.variant, rule.confidence, Some(rule.name)),
            None => (EntryVariant::Unknown, 0.0, None),
        };

        debug!(
            "Classified #{} '{}' @ '{}' as {} ({:.2}, rule {:?})",
            index, entry.title, entry.company, variant, confidence, rule
        );

        ClassifiedEntry {
            index,
            entry: entry.clone(),
            variant,
            confidence,
            rule,
        }
    }

    /// Classify every entry against all the others as siblings.
    pub fn classify_all(&self, entries: &[RawExperienceEntry]) -> Vec<ClassifiedEntry> {
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let siblings: Vec<&RawExperienceEntry> = entries
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != index)
                    .map(|(_, sibling)| sibling)
                    .collect();
                self.classify(index, entry, &siblings)
            })
            .collect()
    }
}
