//! pipeline-inspect: show what the prediction engine extracts from CI configuration files
//!
//! Usage:
//!   pipeline-inspect <file>...              # detected provider + raw signals as JSON lines
//!   pipeline-inspect <file>... --features   # also the feature row, column by column
//!   pipeline-inspect <file>... -q           # quiet: exit 0 if every provider was recognized, 1 otherwise
//!
//! No artifacts needed: runs only the parser and feature builder.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use prediction_engine::features::{self, COLUMNS};
use prediction_engine::parser;
use prediction_engine::types::RawPipelineSignals;
use prediction_engine::Provider;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "pipeline-inspect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Show detected provider and extracted signals for CI configuration files", long_about = None)]
struct Cli {
    /// Configuration files (.yml / .yaml)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Include the numeric feature row and normalized text
    #[arg(short, long)]
    features: bool,

    /// Quiet: only exit code (0 = all recognized, 1 = some unknown)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Serialize)]
struct Column {
    name: &'static str,
    value: f64,
}

#[derive(Serialize)]
struct Report {
    file: String,
    signals: RawPipelineSignals,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<Column>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

fn inspect(file: &str, content: &[u8], with_features: bool) -> Report {
    let signals = parser::parse(content, Some(file));
    let (columns, text) = if with_features {
        let fv = features::from_signals(&signals);
        let columns = COLUMNS
            .iter()
            .zip(fv.numeric)
            .map(|(name, value)| Column { name: *name, value })
            .collect();
        (Some(columns), Some(fv.text))
    } else {
        (None, None)
    };
    Report {
        file: file.to_string(),
        signals,
        columns,
        text,
    }
}

fn main() {
    let cli = Cli::parse();
    let mut all_recognized = true;

    for path in &cli.files {
        let name = path.display().to_string();
        let content = fs::read(path).unwrap_or_else(|e| {
            eprintln!("pipeline-inspect: cannot read {}: {}", name, e);
            process::exit(2);
        });

        let report = inspect(&name, &content, cli.features);
        if report.signals.provider == Provider::Unknown {
            all_recognized = false;
        }
        if cli.quiet {
            continue;
        }
        match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                eprintln!("pipeline-inspect: cannot encode report for {}: {}", name, e);
                process::exit(2);
            }
        }
    }

    process::exit(if all_recognized { 0 } else { 1 });
}
