//! unnest - recursive nested-archive extractor
//!
//! With no arguments, extracts everything under `source/` next to the
//! executable using the built-in password.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use unnest::archive::Extractor;
use unnest::config::{Overrides, RunConfig};
use unnest::progress::Reporter;
use unnest::report::RunReport;
use unnest::settings::Settings;
use unnest::traverse::Traversal;

#[derive(Parser)]
#[command(name = "unnest")]
#[command(version)]
#[command(about = "Recursively extracts nested archives until none remain")]
struct Cli {
    /// Directory to scan (default: source/ next to the executable)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Password applied to every archive
    #[arg(long, env = "UNNEST_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to the 7z binary (default: search PATH)
    #[arg(long = "seven-zip", env = "UNNEST_7Z")]
    seven_zip: Option<PathBuf>,

    /// Also extract split archives starting at their .001 volume
    #[arg(long)]
    split_volumes: bool,

    /// Write a JSON run report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialise logging: {:#}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let rule = "=".repeat(60);
            eprintln!("{}\nError: {:#}\n{}", rule, e, rule);
            ExitCode::from(1)
        }
    }
}

/// Only initialize logging if verbose or RUST_LOG is set
fn init_logging(verbose: bool) -> Result<()> {
    if verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(if verbose { "unnest=debug".parse()? } else { "unnest=warn".parse()? }),
            )
            .init();
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load();
    let config = RunConfig::resolve(
        Overrides {
            root: cli.root,
            password: cli.password,
            seven_zip: cli.seven_zip,
            split_volumes: cli.split_volumes,
            report: cli.report,
        },
        &settings,
    )?;

    // Both fatal checks happen before anything touches the tree
    let extractor = Extractor::standard(config.seven_zip.as_deref());
    extractor.ensure_available()?;
    config.validate()?;

    println!("Backends: {}", extractor.available_backends().join(" -> "));
    println!("Source directory: {}", config.root.display());
    match &config.password {
        Some(pw) => println!("Password: {}", pw),
        None => println!("Password: (none)"),
    }

    let started_at = Utc::now();
    let reporter = Reporter::new();
    let summary = Traversal::new(&extractor, config.password.as_deref())
        .with_split_volumes(config.split_volumes)
        .run(&config.root, &reporter);

    if let Some(path) = &config.report {
        // The run itself finished; a report failure doesn't change the exit code
        match RunReport::new(&config.root, started_at, summary).write(path) {
            Ok(()) => println!("Report written to {}", path.display()),
            Err(e) => {
                tracing::warn!("{:#}", e);
                eprintln!("Could not write report: {:#}", e);
            }
        }
    }

    Ok(())
}
