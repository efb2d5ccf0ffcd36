// src/reconciliation/overrides.rs
//! Static table of authoritative tenure totals, keyed by profile id.
//!
//! The table is a manual escape hatch for profiles whose computed total is
//! known to be wrong. It is loaded once and never mutated; lookups are exact.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::core::FsOps;
use crate::utils::profile_id_from_url;

/// Overrides above this are rejected as typos.
pub const MAX_OVERRIDE_YEARS: u32 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub profile_id: String,
    pub years: u32,
    #[serde(default)]
    pub reason: String,
}

impl OverrideRecord {
    pub fn new(profile_id: &str, years: u32, reason: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            years,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    overrides: Vec<OverrideRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct OverrideRegistry {
    records: HashMap<String, OverrideRecord>,
}

impl OverrideRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from records, keying each by its profile id (URLs are reduced to
    /// their id). Empty ids, implausible years and duplicates are rejected.
    pub fn from_records(records: Vec<OverrideRecord>) -> Result<Self> {
        let mut table = HashMap::with_capacity(records.len());

        for mut record in records {
            record.profile_id = profile_id_from_url(&record.profile_id);

            if record.profile_id.is_empty() {
                anyhow::bail!("Override record has an empty profile_id: {:?}", record);
            }
            if record.years > MAX_OVERRIDE_YEARS {
                anyhow::bail!(
                    "Override for '{}' has implausible years: {} (max {})",
                    record.profile_id,
                    record.years,
                    MAX_OVERRIDE_YEARS
                );
            }
            if table.contains_key(&record.profile_id) {
                anyhow::bail!("Duplicate override for profile '{}'", record.profile_id);
            }

            table.insert(record.profile_id.clone(), record);
        }

        Ok(Self { records: table })
    }

    /// Load from `.toml` (`[[overrides]]`), `.yaml`/`.yml` (`overrides:` list)
    /// or `.csv` (`profile_id,years,reason` with header).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = FsOps::read_file_safe(path)?;

        let records = match FsOps::extension(path).as_deref() {
            Some("toml") => {
                toml::from_str::<OverrideFile>(&content)
                    .with_context(|| format!("Failed to parse override table: {}", path.display()))?
                    .overrides
            }
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str::<OverrideFile>(&content)
                    .with_context(|| format!("Failed to parse override table: {}", path.display()))?
                    .overrides
            }
            Some("csv") => Self::parse_csv(&content)
                .with_context(|| format!("Failed to parse override CSV: {}", path.display()))?,
            other => anyhow::bail!(
                "Unsupported override table format: {:?}. Use .toml, .yaml, .yml or .csv",
                other
            ),
        };

        let registry = Self::from_records(records)
            .with_context(|| format!("Invalid override table: {}", path.display()))?;
        info!(
            "Loaded {} tenure overrides from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    fn parse_csv(content: &str) -> Result<Vec<OverrideRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut records = Vec::new();
        for (line, result) in reader.deserialize::<OverrideRecord>().enumerate() {
            let record = result.with_context(|| format!("Invalid CSV record {}", line + 1))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Exact match after the same id normalisation the loader applies, so a
    /// record registered as "Jane-Doe" is found by "Jane-Doe" or its URL.
    pub fn lookup(&self, profile_id: &str) -> Option<&OverrideRecord> {
        self.records.get(&profile_id_from_url(profile_id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records sorted by profile id.
    pub fn records(&self) -> Vec<&OverrideRecord> {
        let mut records: Vec<&OverrideRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.profile_id.cmp(&b.profile_id));
        records
    }

    /// Render as a TOML `[[overrides]]` table.
    pub fn to_toml_string(&self) -> Result<String> {
        let file = OverrideFile {
            overrides: self.records().into_iter().cloned().collect(),
        };
        toml::to_string(&file).context("Failed to serialize override table")
    }
}
