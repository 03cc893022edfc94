//! Argument surface of the `tally` binary.
//!
//! Rules:
//! - `--scenario` is a local JSON file (no URI schemes).
//! - `--out` is the snapshot file to write; parent directories are created.
//! - `--validate-only` loads and checks the configuration without replaying events.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "tally",
    disable_help_subcommand = true,
    about = "Replay end-result events and write a canonical snapshot"
)]
pub struct Args {
    /// Scenario JSON: parameters, political businesses and events.
    #[arg(long)]
    pub scenario: PathBuf,

    /// Write the canonical snapshot JSON to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Check the scenario and its configuration only; no events are applied.
    #[arg(long)]
    pub validate_only: bool,

    /// Disable the automatic mandate distribution of the scenario parameters.
    #[arg(long)]
    pub manual_distribution: bool,

    /// Print nothing on success.
    #[arg(long, short)]
    pub quiet: bool,

    /// Log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins when set.
    #[arg(long, short, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
            CliError::NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}

impl std::error::Error for CliError {}

pub fn parse_and_validate() -> Result<Args, CliError> {
    validate(Args::parse())
}

fn validate(args: Args) -> Result<Args, CliError> {
    for p in [Some(args.scenario.as_path()), args.out.as_deref()].into_iter().flatten() {
        ensure_local_path(p)?;
    }
    if !args.scenario.is_file() {
        return Err(CliError::NotFound(args.scenario.display().to_string()));
    }
    Ok(args)
}

fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    match p.to_str() {
        Some(s) if has_scheme(s) => Err(CliError::NonLocalPath(s.to_string())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemes_are_rejected() {
        assert!(has_scheme("https://example.org/s.json"));
        assert!(has_scheme("file:/tmp/s.json"));
        assert!(!has_scheme("demos/majority_election.json"));
        assert!(matches!(
            ensure_local_path(Path::new("http://x/y.json")),
            Err(CliError::NonLocalPath(_))
        ));
    }

    #[test]
    fn flags_parse() {
        let a = Args::try_parse_from(["tally", "--scenario", "s.json", "-vv", "--manual-distribution"]).unwrap();
        assert_eq!(a.verbose, 2);
        assert!(a.manual_distribution);
        assert!(a.out.is_none());
        assert!(Args::try_parse_from(["tally"]).is_err());
    }

    #[test]
    fn missing_scenario_is_reported() {
        let a = Args::try_parse_from(["tally", "--scenario", "does/not/exist.json"]).unwrap();
        assert!(matches!(validate(a), Err(CliError::NotFound(_))));
    }
}
