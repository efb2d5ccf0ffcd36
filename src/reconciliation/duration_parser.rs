// src/reconciliation/duration_parser.rs
//! Free-text duration fragments to normalised intervals.
//!
//! Recognised shapes, in the order they are trusted:
//! - explicit platform tokens: "3 yrs 2 mos", "1 yr", "11 mos"
//! - date ranges: "Jan 2019 - Mar 2021", "2015 - Present", "Sept. 2020 – Current"
//! - the "less than a year" idiom, estimated at a fixed month count

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::EngineConfig;
use crate::types::experience::{DurationConflict, ParsedInterval, YearMonth};
use crate::utils::clean_text;

const MONTH_PATTERN: &str = "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

const MONTH_NAMES: &[(&str, u32)] = &[
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("sept", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

/// Leading whitespace tokens inspected for the grouped-header check.
const LEADING_TOKENS: usize = 4;

static EXPLICIT_YEARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s*(?:yrs?|years?)\b(?:[\s,·•]*(?:and\s+)?(\d{1,2})\s*(?:mos?|months?)\b)?",
    )
    .expect("explicit years pattern is valid")
});

static EXPLICIT_MONTHS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*(?:mos?|months?)\b").expect("explicit months pattern is valid")
});

static LESS_THAN_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bless\s+than\s+(?:a|one|1)\s+(?:yr|year)\b")
        .expect("less-than-a-year pattern is valid")
});

static DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?i)(?:\b(?P<start_month>{m})\.?\s+)?\b(?P<start_year>(?:19|20)\d{{2}})\s*(?:-|–|—|\bto\b)\s*(?:(?:\b(?P<end_month>{m})\.?\s+)?\b(?P<end_year>(?:19|20)\d{{2}})\b|\b(?P<open>present|current|now)\b)",
        m = MONTH_PATTERN
    );
    Regex::new(&pattern).expect("date range pattern is valid")
});

pub fn month_from_name(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    MONTH_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, month)| *month)
}

/// Explicit "X yrs Y mos" or "Y mos" month count, if present.
pub fn explicit_months(text: &str) -> Option<u32> {
    if let Some(caps) = EXPLICIT_YEARS.captures(text) {
        let years: u32 = caps.get(1)?.as_str().parse().ok()?;
        let months: u32 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return Some(years * 12 + months);
    }

    EXPLICIT_MONTHS
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn has_date_range(text: &str) -> bool {
    DATE_RANGE.is_match(text)
}

/// Any duration signal at all.
pub fn has_duration_signal(text: &str) -> bool {
    explicit_months(text).is_some() || has_date_range(text) || LESS_THAN_YEAR.is_match(text)
}

/// An explicit token with no date range beside it, the shape of an employer rollup line.
pub fn is_bare_duration(text: &str) -> bool {
    explicit_months(text).is_some() && !has_date_range(text)
}

/// Whether the first few tokens of the text already carry a duration.
pub fn leading_tokens_have_duration(text: &str) -> bool {
    let head = text
        .split_whitespace()
        .take(LEADING_TOKENS)
        .collect::<Vec<_>>()
        .join(" ");
    has_duration_signal(&head)
}

#[derive(Debug, Clone)]
pub struct DurationParser {
    today: YearMonth,
    conflict_tolerance_months: u32,
    less_than_year_months: u32,
}

impl DurationParser {
    pub fn new(today: YearMonth) -> Self {
        Self::from_config(&EngineConfig::default(), today)
    }

    pub fn from_config(config: &EngineConfig, today: YearMonth) -> Self {
        Self {
            today,
            conflict_tolerance_months: config.conflict_tolerance_months,
            less_than_year_months: config.less_than_year_months,
        }
    }

    pub fn today(&self) -> YearMonth {
        self.today
    }

    pub fn parse(&self, text: &str) -> ParsedInterval {
        let text = clean_text(text);
        if text.is_empty() {
            return ParsedInterval::unparseable();
        }

        let explicit = explicit_months(&text);
        let range = self.date_range(&text);

        match (explicit, range) {
            (Some(explicit), Some((start, end))) if start <= end => {
                let range_months = start.months_through(&end);
                let mut interval = ParsedInterval {
                    months: Some(explicit),
                    start: Some(start),
                    end: Some(end),
                    is_explicit: true,
                    ..Default::default()
                };

                if explicit.abs_diff(range_months) > self.conflict_tolerance_months {
                    debug!(
                        "Explicit duration {} mos overrides range {} - {} ({} mos) in '{}'",
                        explicit, start, end, range_months, text
                    );
                    interval.conflict = Some(DurationConflict {
                        explicit_months: explicit,
                        range_months,
                    });
                }
                interval
            }
            (Some(explicit), _) => ParsedInterval {
                months: Some(explicit),
                is_explicit: true,
                ..Default::default()
            },
            (None, Some((start, end))) if start <= end => ParsedInterval {
                months: Some(start.months_through(&end)),
                start: Some(start),
                end: Some(end),
                ..Default::default()
            },
            (None, Some((start, end))) => {
                debug!("Reversed date range {} - {} in '{}'", start, end, text);
                ParsedInterval {
                    months: Some(0),
                    ..Default::default()
                }
            }
            (None, None) if LESS_THAN_YEAR.is_match(&text) => ParsedInterval {
                months: Some(self.less_than_year_months),
                is_estimate: true,
                ..Default::default()
            },
            (None, None) => ParsedInterval::unparseable(),
        }
    }

    fn date_range(&self, text: &str) -> Option<(YearMonth, YearMonth)> {
        let caps = DATE_RANGE.captures(text)?;

        let start = Self::resolve(
            caps.name("start_month").map(|m| m.as_str()),
            caps.name("start_year")?.as_str(),
        )?;

        let end = if caps.name("open").is_some() {
            self.today
        } else {
            Self::resolve(
                caps.name("end_month").map(|m| m.as_str()),
                caps.name("end_year")?.as_str(),
            )?
        };

        Some((start, end))
    }

    /// A bare year resolves to January.
    fn resolve(month: Option<&str>, year: &str) -> Option<YearMonth> {
        let year: i32 = year.parse().ok()?;
        let month = match month {
            Some(name) => month_from_name(name)?,
            None => 1,
        };
        YearMonth::new(year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DurationParser {
        DurationParser::new(YearMonth { year: 2024, month: 6 })
    }

    fn ym(year: i32, month: u32) -> Option<YearMonth> {
        YearMonth::new(year, month)
    }

    #[test]
    fn test_explicit_years_and_months() {
        let interval = parser().parse("14 yrs 7 mos");
        assert_eq!(interval.months, Some(175));
        assert!(interval.is_explicit);
        assert!(interval.resolved_range().is_none());
    }

    #[test]
    fn test_explicit_variants() {
        assert_eq!(explicit_months("1 yr"), Some(12));
        assert_eq!(explicit_months("3 YRS"), Some(36));
        assert_eq!(explicit_months("2 years, 4 months"), Some(28));
        assert_eq!(explicit_months("Full-time · 1 yr · 5 mos"), Some(17));
        assert_eq!(explicit_months("11 mos"), Some(11));
        assert_eq!(explicit_months("Jan 2019 - Present"), None);
    }

    #[test]
    fn test_date_range_is_inclusive_of_start_month() {
        let interval = parser().parse("Jan 2018 - Dec 2019");
        assert_eq!(interval.months, Some(24));
        assert_eq!(interval.start, ym(2018, 1));
        assert_eq!(interval.end, ym(2019, 12));
        assert!(!interval.is_explicit);
    }

    #[test]
    fn test_full_month_names_and_dashes() {
        let interval = parser().parse("September 2020 – March 2021");
        assert_eq!(interval.months, Some(7));

        let interval = parser().parse("Sept. 2020 to Oct. 2020");
        assert_eq!(interval.months, Some(2));
    }

    #[test]
    fn test_present_resolves_to_today() {
        let interval = parser().parse("Jan 2024 - Present");
        assert_eq!(interval.end, ym(2024, 6));
        assert_eq!(interval.months, Some(6));

        let interval = parser().parse("Mar 2023 - current");
        assert_eq!(interval.months, Some(16));
    }

    #[test]
    fn test_bare_year_resolves_to_january() {
        let interval = parser().parse("2015 - 2018");
        assert_eq!(interval.start, ym(2015, 1));
        assert_eq!(interval.end, ym(2018, 1));
        assert_eq!(interval.months, Some(37));
    }

    #[test]
    fn test_explicit_wins_over_disagreeing_range() {
        let interval = parser().parse("Jan 2019 - Mar 2019 · 3 yrs 2 mos");
        assert_eq!(interval.months, Some(38));
        assert_eq!(
            interval.conflict,
            Some(DurationConflict {
                explicit_months: 38,
                range_months: 3
            })
        );
        assert!(interval.resolved_range().is_none());
    }

    #[test]
    fn test_agreeing_range_is_kept_for_timeline() {
        let interval = parser().parse("Jan 2019 - Dec 2020 · 2 yrs");
        assert_eq!(interval.months, Some(24));
        assert!(interval.conflict.is_none());
        assert_eq!(interval.resolved_range(), Some((ym(2019, 1).unwrap(), ym(2020, 12).unwrap())));
    }

    #[test]
    fn test_disagreement_at_tolerance_is_not_a_conflict() {
        // 12 months of range vs 18 explicit: exactly the 6-month tolerance
        let interval = parser().parse("Jan 2019 - Dec 2019 · 1 yr 6 mos");
        assert!(interval.conflict.is_none());

        let interval = parser().parse("Jan 2019 - Dec 2019 · 1 yr 7 mos");
        assert!(interval.conflict.is_some());
    }

    #[test]
    fn test_less_than_a_year_estimate() {
        let interval = parser().parse("less than a year");
        assert_eq!(interval.months, Some(6));
        assert!(interval.is_estimate);
        assert!(!interval.is_explicit);
    }

    #[test]
    fn test_reversed_range_floors_at_zero() {
        let interval = parser().parse("2020 - 2018");
        assert_eq!(interval.months, Some(0));
        assert!(interval.resolved_range().is_none());
    }

    #[test]
    fn test_unparseable_text() {
        assert!(parser().parse("").is_unparseable());
        assert!(parser().parse("   ").is_unparseable());
        assert!(parser().parse("Remote · Hybrid").is_unparseable());
        assert!(parser().parse("Foo 2019").is_unparseable());
    }

    #[test]
    fn test_month_lookup_table() {
        assert_eq!(month_from_name("Jan"), Some(1));
        assert_eq!(month_from_name("sept."), Some(9));
        assert_eq!(month_from_name("DECEMBER"), Some(12));
        assert_eq!(month_from_name("Smarch"), None);
    }

    #[test]
    fn test_shape_helpers() {
        assert!(is_bare_duration("14 yrs 7 mos"));
        assert!(!is_bare_duration("Jan 2019 - Present · 5 yrs"));
        assert!(leading_tokens_have_duration("3 yrs 2 mos · Paris"));
        assert!(!leading_tokens_have_duration("Acme Holdings International Group 3 yrs"));
        assert!(has_duration_signal("Less than a year"));
    }
}
