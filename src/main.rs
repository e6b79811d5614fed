// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use gpkg_merge::db::schema::DEFAULT_TABLE_NAME;
use gpkg_merge::{MergeOptions, merge};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gpkg-merge")]
#[command(author, version, about = "Merge the tile sets of two GeoPackages; the second file wins conflicts", long_about = None)]
struct Cli {
    /// Low-priority GeoPackage; its tiles only fill gaps
    file_a: PathBuf,

    /// High-priority GeoPackage; its tiles win every conflict
    file_b: PathBuf,

    /// Output path (default: merged_<a>_<b>.gpkg; never overwrites an existing file)
    output: Option<PathBuf>,

    /// Name of the merged tile table
    #[arg(default_value = DEFAULT_TABLE_NAME)]
    table_name: String,

    /// Print the merge report as JSON
    #[arg(long)]
    json: bool,

    /// Skip compacting the output after the merge
    #[arg(long)]
    no_vacuum: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> Result<()> {
    let options = MergeOptions {
        output: cli.output,
        table_name: cli.table_name,
        vacuum: !cli.no_vacuum,
    };

    info!(
        "Merging {} (low priority) with {} (high priority)",
        cli.file_a.display(),
        cli.file_b.display()
    );

    let report = merge(&cli.file_a, &cli.file_b, &options).with_context(|| {
        format!(
            "Failed to merge {} and {}",
            cli.file_a.display(),
            cli.file_b.display()
        )
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<gpkg_merge::Error>()
                .map(gpkg_merge::Error::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
