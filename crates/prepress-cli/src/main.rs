// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// prepress — command-line preflight.
//
// Entry point. Initialises logging, loads the engine configuration once,
// validates one PDF against an order, and prints the result as JSON on
// stdout. Logs go to stderr so stdout stays machine-readable.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use prepress_core::error::{PreflightError, Result};
use prepress_core::{PreflightConfig, ValidationOptions, ValidationResult};
use prepress_engine::{GhostscriptProbe, NullProbe, Preflight, ToolLimiter};

/// Exit status for a file with blocking errors.
const EXIT_INVALID: u8 = 1;
/// Exit status when the check itself could not run.
const EXIT_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "prepress", version)]
#[command(about = "Validate a print-ready PDF against an order specification")]
struct Args {
    /// PDF file to check.
    #[arg(value_name = "PDF")]
    pdf: PathBuf,
    /// ValidationOptions JSON (fileType, orderOptions, optional limits).
    #[arg(long, value_name = "JSON")]
    options: PathBuf,
    /// Engine configuration JSON; built-in defaults when omitted.
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,
    /// Skip Ghostscript and decide color mode from structure alone.
    #[arg(long)]
    no_ink_coverage: bool,
    /// Pretty-print the result.
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start async runtime");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(result) if result.is_valid => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_INVALID),
        Err(err) => {
            tracing::error!(error = %err, "preflight failed");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(args: &Args) -> Result<ValidationResult> {
    let config = match &args.config {
        Some(path) => PreflightConfig::load(path)?,
        None => PreflightConfig::default(),
    };
    let options = load_options(&args.options)?;
    let data = tokio::fs::read(&args.pdf).await?;
    tracing::info!(pdf = %args.pdf.display(), bytes = data.len(), "preflight starting");

    let limiter = ToolLimiter::new(config.tool_concurrency);
    let result = if args.no_ink_coverage {
        Preflight::new(config, NullProbe, limiter)
            .validate(&data, &options)
            .await
    } else {
        let probe = GhostscriptProbe::new(config.ghostscript_binary.clone());
        Preflight::new(config, probe, limiter)
            .validate(&data, &options)
            .await
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");
    Ok(result)
}

fn load_options(path: &Path) -> Result<ValidationOptions> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| {
        PreflightError::Config(format!("invalid options in {}: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn options_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(
            &path,
            r#"{"fileType":"cover","orderOptions":{"size":{"width":210,"height":297},
                "pageCount":100,"binding":"perfect","bleed":3,"paperThickness":0.1}}"#,
        )
        .unwrap();

        let options = load_options(&path).unwrap();
        assert_eq!(options.file_type, prepress_core::FileType::Cover);
        assert_eq!(options.order_options.paper_thickness, Some(0.1));
    }

    #[test]
    fn bad_options_are_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"fileType":"poster"}"#).unwrap();

        assert!(matches!(load_options(&path), Err(PreflightError::Config(_))));
    }

    #[test]
    fn missing_options_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_options(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PreflightError::Io(_)));
    }
}
