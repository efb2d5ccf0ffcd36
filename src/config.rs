// src/config.rs
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::FsOps;
use crate::types::experience::YearMonth;

/// Tunable heuristics for one reconciliation engine.
///
/// `undated_overlap_factor` and `undated_discount_threshold` have no known
/// derivation; they reproduce observed behaviour and are kept adjustable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit token wins over a date range when they differ by more than this.
    pub conflict_tolerance_months: u32,
    /// Estimate used for "less than a year" when nothing else is known.
    pub less_than_year_months: u32,
    pub undated_overlap_factor: f64,
    /// Undated entries are discounted once more than this many dated entries exist.
    pub undated_discount_threshold: usize,
    pub max_total_years: u32,
    /// Entries restored when validation would discard everything.
    pub safety_valve_prefix: usize,
    pub outlier_ratio: f64,
    pub outlier_min_group: usize,
    /// Date that "Present" resolves to; the local clock when unset.
    pub as_of: Option<NaiveDate>,
    pub trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conflict_tolerance_months: 6,
            less_than_year_months: 6,
            undated_overlap_factor: 0.5,
            undated_discount_threshold: 3,
            max_total_years: 40,
            safety_valve_prefix: 5,
            outlier_ratio: 2.0,
            outlier_min_group: 3,
            as_of: None,
            trace: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_undated_overlap_factor(mut self, factor: f64) -> Self {
        self.undated_overlap_factor = factor;
        self
    }

    pub fn with_undated_discount_threshold(mut self, threshold: usize) -> Self {
        self.undated_discount_threshold = threshold;
        self
    }

    pub fn with_max_total_years(mut self, years: u32) -> Self {
        self.max_total_years = years;
        self
    }

    /// The month "Present"/"Current" resolves to.
    pub fn reference_month(&self) -> YearMonth {
        let today = self.as_of.unwrap_or_else(|| Local::now().date_naive());
        YearMonth::from_date(today)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file; missing fields keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = FsOps::read_file_safe(path)?;

        let config: Self = match FsOps::extension(path).as_deref() {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse engine config: {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse engine config: {}", path.display()))?,
            other => anyhow::bail!(
                "Unsupported engine config format: {:?}. Use .toml, .yaml or .yml",
                other
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.undated_overlap_factor) {
            anyhow::bail!(
                "undated_overlap_factor must be within 0.0..=1.0, got {}",
                self.undated_overlap_factor
            );
        }
        if self.outlier_ratio <= 1.0 {
            anyhow::bail!("outlier_ratio must be greater than 1.0, got {}", self.outlier_ratio);
        }
        if self.max_total_years == 0 {
            anyhow::bail!("max_total_years must be positive");
        }
        Ok(())
    }
}
