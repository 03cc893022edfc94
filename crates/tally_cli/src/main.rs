//! `tally`: offline replay of an end-result scenario.
//!
//! load → (validate-only | replay events) → canonical snapshot → digest.
//! The snapshot id and scenario digest are printed as one JSON line.

mod args;

mod exitcodes {
    pub const OK: u8 = 0;
    /// Malformed scenario, rejected configuration or rejected event.
    pub const VALIDATION: u8 = 2;
    /// Internal invariant violated; the event was aborted.
    pub const INVARIANT: u8 = 3;
    pub const IO: u8 = 4;
}

use std::process::ExitCode;

use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use args::{parse_and_validate as parse_cli, Args};
use tally_core::EngineError;
use tally_io::{canonical_json, IoError};
use tally_pipeline::{run_scenario, EndResultSet, PipelineError};

#[derive(Debug)]
enum MainError {
    Validation(String),
    Invariant(String),
    Io(String),
}

impl MainError {
    fn exit_code(&self) -> u8 {
        match self {
            MainError::Validation(_) => exitcodes::VALIDATION,
            MainError::Invariant(_) => exitcodes::INVARIANT,
            MainError::Io(_) => exitcodes::IO,
        }
    }

    fn message(&self) -> &str {
        match self {
            MainError::Validation(m) | MainError::Invariant(m) | MainError::Io(m) => m,
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("tally: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION);
        }
    };
    init_logging(&args);

    let outcome = if args.validate_only { validate_only(&args) } else { run_once(&args) };
    match outcome {
        Ok(()) => ExitCode::from(exitcodes::OK),
        Err(e) => {
            error!(exit_code = e.exit_code(), "{}", e.message());
            eprintln!("tally: error: {}", e.message());
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(args: &Args) {
    let default = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(args: &Args) -> Result<tally_io::Scenario, MainError> {
    let mut scenario = tally_io::load_scenario(&args.scenario).map_err(map_io_err)?;
    if args.manual_distribution {
        scenario.params.automatic_mandate_distribution = false;
    }
    Ok(scenario)
}

fn validate_only(args: &Args) -> Result<(), MainError> {
    let scenario = load(args)?;
    EndResultSet::new(scenario.params.clone(), scenario.political_businesses.clone())
        .map_err(|e| map_engine_err(format!("configuration: {e}"), &e))?;
    info!(
        political_businesses = scenario.political_businesses.len(),
        events = scenario.events.len(),
        "scenario is valid"
    );
    if !args.quiet {
        eprintln!("validate-only: scenario OK");
    }
    Ok(())
}

fn run_once(args: &Args) -> Result<(), MainError> {
    let scenario = load(args)?;
    let outputs = run_scenario(&scenario).map_err(map_pipeline_err)?;
    if let Some(out) = &args.out {
        canonical_json::write_canonical_file(out, &outputs.snapshot).map_err(map_io_err)?;
        info!(path = %out.display(), "snapshot written");
    }
    if !args.quiet {
        println!(
            "{}",
            json!({
                "applied_events": outputs.applied_events,
                "scenario_sha256": outputs.scenario_sha256,
                "snapshot_id": outputs.snapshot_id,
            })
        );
    }
    Ok(())
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Json { .. } | IoError::Invalid(_) => MainError::Validation(e.to_string()),
        IoError::Path(_) => MainError::Io(e.to_string()),
    }
}

fn map_engine_err(msg: String, e: &EngineError) -> MainError {
    if e.is_invariant_violation() {
        MainError::Invariant(msg)
    } else {
        MainError::Validation(msg)
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        PipelineError::Io(io) => map_io_err(io),
        PipelineError::Config(ref inner) | PipelineError::Event { error: ref inner, .. } => {
            map_engine_err(e.to_string(), inner)
        }
    }
}
