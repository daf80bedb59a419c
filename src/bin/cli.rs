//! Command-line interface for EnzymeML archives
//!
//! # Usage
//!
//! ```bash
//! # Build an archive from a spreadsheet record and its measurement table
//! enzymeml-archive build --record record.json --data data.csv --out archives
//!
//! # Print an overview of an existing archive
//! enzymeml-archive inspect archives/Ethanol_oxidation_Doe.omex
//! ```

use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use colored::Colorize;
use enzymeml_archive::{
    error::EnzymeMLError,
    io::{create_archive_with, load_from_file, ArchiveOptionsBuilder},
    record::{read_measurements, ExperimentRecord},
};

/// Main CLI configuration struct
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Build an EnzymeML archive from an experiment record
    Build {
        /// Path to the JSON record of the experiment form
        #[arg(short, long, help = "Path to the JSON experiment record")]
        record: PathBuf,

        /// Path to the measurement table
        #[arg(short, long, help = "Path to the CSV measurement table")]
        data: PathBuf,

        /// Name of the document and the archive
        #[arg(short, long, help = "Document name, derived from the record if omitted")]
        name: Option<String>,

        /// Directory receiving the archive
        #[arg(short, long, default_value = ".", help = "Output directory")]
        out: PathBuf,

        /// Keep the staging directory next to the archive
        #[arg(long, help = "Keep the staging directory after writing")]
        keep_staging: bool,

        /// Store entries without compression
        #[arg(long, help = "Store archive entries uncompressed")]
        no_compress: bool,
    },
    /// Print an overview of an EnzymeML archive
    Inspect {
        /// Path to the archive
        #[arg(help = "Path to the .omex archive")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            record,
            data,
            name,
            out,
            keep_staging,
            no_compress,
        } => build(record, data, name, out, keep_staging, !no_compress),
        Commands::Inspect { path } => inspect(path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "Error:".bold().red(), err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn build(
    record: PathBuf,
    data: PathBuf,
    name: Option<String>,
    out: PathBuf,
    keep_staging: bool,
    compress: bool,
) -> Result<(), EnzymeMLError> {
    let record = ExperimentRecord::from_json(&fs::read_to_string(&record)?)?;
    let table = read_measurements(&fs::read_to_string(&data)?);

    let mut doc = record.build(name.as_deref(), &table)?;
    for diagnostic in doc.diagnostics() {
        println!("{} {}", "Warning:".yellow(), diagnostic);
    }

    let options = ArchiveOptionsBuilder::default()
        .output_dir(out)
        .keep_staging(keep_staging)
        .compress(compress)
        .build()
        .map_err(|err| EnzymeMLError::InvalidValue {
            field: "options".to_string(),
            reason: err.to_string(),
        })?;

    let path = create_archive_with(&mut doc, &options)?;
    println!("{} {}", "Written".green().bold(), path.display());
    Ok(())
}

fn inspect(path: PathBuf) -> Result<(), EnzymeMLError> {
    let doc = load_from_file(&path)?;
    println!("{doc}");

    if doc.diagnostics().is_empty() {
        println!("{}", "No diagnostics".green());
    } else {
        for diagnostic in doc.diagnostics() {
            println!("{} {}", "Warning:".yellow(), diagnostic);
        }
    }
    Ok(())
}
