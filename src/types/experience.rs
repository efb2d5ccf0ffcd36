// src/types/experience.rs
//! Experience record structures shared by every reconciliation stage

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::embedded_duration_fragment;

// ===== Scraper Input =====

/// One experience record as flattened by the profile scraper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExperienceEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Set by the scraper when the record is a container owning nested roles.
    #[serde(default)]
    pub is_group_header: bool,
}

impl RawExperienceEntry {
    pub fn new(title: &str, company: &str, duration: &str) -> Self {
        Self {
            title: title.to_string(),
            company: company.to_string(),
            duration: duration.to_string(),
            location: None,
            is_group_header: false,
        }
    }

    pub fn as_group_header(mut self) -> Self {
        self.is_group_header = true;
        self
    }

    /// The duration text to parse: the `duration` field, or the fragment
    /// embedded in `company` ("Acme · 14 yrs 7 mos") when that field is empty.
    pub fn duration_text(&self) -> &str {
        if !self.duration.trim().is_empty() {
            return &self.duration;
        }
        embedded_duration_fragment(&self.company).unwrap_or_default()
    }
}

// ===== Classification =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryVariant {
    IndividualRole,
    EmployerRollup,
    GroupedHeader,
    Unknown,
}

impl EntryVariant {
    /// Only roles and surviving rollups carry tenure that can be counted.
    pub fn is_countable(&self) -> bool {
        matches!(self, Self::IndividualRole | Self::EmployerRollup)
    }
}

impl fmt::Display for EntryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::IndividualRole => "individual_role",
            Self::EmployerRollup => "employer_rollup",
            Self::GroupedHeader => "grouped_header",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A raw entry labelled by the classifier.
///
/// `variant` is fixed once assigned; later stages only decide whether the
/// entry is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedEntry {
    /// Position of the entry in the scraper's input list.
    pub index: usize,
    pub entry: RawExperienceEntry,
    pub variant: EntryVariant,
    pub confidence: f64,
    /// Name of the classifier rule that fired, `None` for `Unknown`.
    pub rule: Option<&'static str>,
}

// ===== Calendar Months =====

/// A calendar month, the timeline's unit of occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Returns `None` for months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Inclusive month count from `self` to `end`, floored at 0.
    pub fn months_through(&self, end: &YearMonth) -> u32 {
        let span = (end.year - self.year) as i64 * 12 + (end.month as i64 - self.month as i64) + 1;
        span.max(0) as u32
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every month from `self` to `end` inclusive; empty when `end` precedes `self`.
    pub fn iter_through(self, end: YearMonth) -> impl Iterator<Item = YearMonth> {
        std::iter::successors(Some(self), |current| Some(current.next()))
            .take_while(move |current| *current <= end)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ===== Parsed Durations =====

/// Disagreement between an explicit "X yrs Y mos" token and the date range
/// found in the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationConflict {
    pub explicit_months: u32,
    pub range_months: u32,
}

/// Normalised reading of a free-text duration fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedInterval {
    pub months: Option<u32>,
    pub start: Option<YearMonth>,
    pub end: Option<YearMonth>,
    /// Months came from a platform-rendered "X yrs Y mos" token.
    pub is_explicit: bool,
    /// Months are the fixed "less than a year" estimate.
    pub is_estimate: bool,
    /// Explicit token outvoted a disagreeing date range.
    pub conflict: Option<DurationConflict>,
}

impl ParsedInterval {
    /// The "no signal" outcome.
    pub fn unparseable() -> Self {
        Self::default()
    }

    pub fn is_unparseable(&self) -> bool {
        self.months.is_none() && self.resolved_range().is_none()
    }

    /// The date range usable for timeline placement.
    ///
    /// A range outvoted by an explicit token is kept for diagnostics but not
    /// placed, otherwise the timeline would count the lossy span instead.
    pub fn resolved_range(&self) -> Option<(YearMonth, YearMonth)> {
        if self.conflict.is_some() {
            return None;
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        }
    }

    /// Months this interval contributes: the placed span when it has one,
    /// otherwise the explicit or estimated count.
    pub fn month_count(&self) -> Option<u32> {
        self.resolved_range()
            .map(|(s, e)| s.months_through(&e))
            .or(self.months)
    }
}

/// A kept entry paired with its parsed duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntry {
    pub classified: ClassifiedEntry,
    pub interval: ParsedInterval,
}

impl ResolvedEntry {
    pub fn index(&self) -> usize {
        self.classified.index
    }
}
