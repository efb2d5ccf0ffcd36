// src/cli.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::{ConfigManager, FsOps};
use crate::reconciliation::{Classifier, DurationParser, OverrideRegistry};
use crate::types::RawExperienceEntry;
use crate::utils::profile_id_from_url;

#[derive(Parser)]
#[command(name = "cvtenure")]
#[command(about = "Reconcile scraped employment history into one tenure total")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Engine config file (.toml/.yaml); falls back to $TENURE_CONFIG
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override table (.toml/.yaml/.csv); falls back to $TENURE_OVERRIDES
    #[arg(long, global = true)]
    pub overrides: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile a JSON array of scraped entries into a total
    Reconcile {
        #[arg(short, long)]
        input: PathBuf,
        /// Profile URL or id used for the override lookup
        #[arg(short, long)]
        profile: String,
        /// Collect stage-by-stage trace events in the diagnostics
        #[arg(long)]
        trace: bool,
        /// Date "Present" resolves to (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Parse a single duration fragment
    Parse { text: String },
    /// Classify each entry of a JSON array without reconciling
    Classify {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Inspect the override table
    Overrides {
        #[command(subcommand)]
        action: OverridesCommand,
    },
}

#[derive(Subcommand)]
pub enum OverridesCommand {
    /// List all overrides
    List,
    /// Show the override for a profile URL or id, if any
    Check { profile: String },
    /// Convert a CSV (profile_id,years,reason) into a TOML override table
    Import { csv_file: PathBuf },
}

fn read_entries(path: &Path) -> Result<Vec<RawExperienceEntry>> {
    let content = FsOps::read_file_safe(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse experience entries: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", rendered);
    Ok(())
}

pub fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Reconcile {
            input,
            profile,
            trace,
            as_of,
        } => {
            let mut manager = ConfigManager::load(cli.config, cli.overrides)?;
            if trace {
                manager.engine.trace = true;
            }
            if let Some(date) = as_of {
                manager.engine.as_of = Some(date);
            }

            let entries = read_entries(&input)?;
            info!("Loaded {} entries from {}", entries.len(), input.display());

            let result = manager.into_reconciler().reconcile_url(&entries, &profile);
            if result.diagnostics.clamped {
                warn!(
                    "Total clamped to {} years; check the input for duplicated rollups",
                    result.total_years
                );
            }
            print_json(&result)
        }

        Command::Parse { text } => {
            let manager = ConfigManager::load(cli.config, None)?;
            let parser =
                DurationParser::from_config(&manager.engine, manager.engine.reference_month());
            print_json(&parser.parse(&text))
        }

        Command::Classify { input } => {
            let entries = read_entries(&input)?;
            print_json(&Classifier::default().classify_all(&entries))
        }

        Command::Overrides { action } => match action {
            OverridesCommand::List => {
                let manager = ConfigManager::load(cli.config, cli.overrides)?;
                if manager.overrides.is_empty() {
                    info!("No overrides configured.");
                }
                print_json(&manager.overrides.records())
            }

            OverridesCommand::Check { profile } => {
                let manager = ConfigManager::load(cli.config, cli.overrides)?;
                let profile_id = profile_id_from_url(&profile);
                match manager.overrides.lookup(&profile_id) {
                    Some(record) => print_json(record),
                    None => {
                        info!("No override for profile '{}'", profile_id);
                        Ok(())
                    }
                }
            }

            OverridesCommand::Import { csv_file } => {
                if FsOps::extension(&csv_file).as_deref() != Some("csv") {
                    anyhow::bail!("Expected a .csv file, got {}", csv_file.display());
                }
                let registry = OverrideRegistry::load_from_file(&csv_file)?;
                print!("{}", registry.to_toml_string()?);
                info!("Imported {} overrides from {}", registry.len(), csv_file.display());
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_reconcile_command() {
        let cli = Cli::try_parse_from([
            "cvtenure",
            "reconcile",
            "--input",
            "entries.json",
            "--profile",
            "https://www.linkedin.com/in/jane-doe/",
            "--as-of",
            "2024-06-01",
            "--trace",
        ])
        .unwrap();

        match cli.command {
            Command::Reconcile {
                input,
                profile,
                trace,
                as_of,
            } => {
                assert_eq!(input, PathBuf::from("entries.json"));
                assert_eq!(profile_id_from_url(&profile), "jane-doe");
                assert!(trace);
                assert_eq!(as_of, NaiveDate::from_ymd_opt(2024, 6, 1));
            }
            _ => panic!("expected reconcile command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cvtenure",
            "overrides",
            "check",
            "jane",
            "--overrides",
            "overrides.toml",
        ])
        .unwrap();
        assert_eq!(cli.overrides, Some(PathBuf::from("overrides.toml")));
    }

    #[test]
    fn test_read_entries_accepts_missing_fields() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"[{"title": "Engineer", "company": "Acme"}, {"duration": "3 yrs"}]"#,
        )
        .unwrap();

        let entries = read_entries(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].duration, "");
        assert_eq!(entries[1].title, "");
    }
}
