// Thin CLI shell over the extraction pipeline
use anyhow::{Context, Result};
use billsnap::{process_document, OutputKind};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Open XML spreadsheet (.xlsx)
    Xlsx,
    /// Comma-separated values (.csv)
    Csv,
}

impl From<Format> for OutputKind {
    fn from(format: Format) -> Self {
        match format {
            Format::Xlsx => OutputKind::Spreadsheet,
            Format::Csv => OutputKind::DelimitedText,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert a credit-card statement PDF to XLSX/CSV")]
struct Args {
    /// Statement PDF to process
    pdf_file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Output path; defaults to the suggested filename next to the cwd
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let bytes = std::fs::read(&args.pdf_file)
        .with_context(|| format!("reading {}", args.pdf_file.display()))?;

    let output = process_document(&bytes, args.format.into())?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&output.artifact.filename));
    std::fs::write(&path, &output.artifact.bytes)
        .with_context(|| format!("writing {}", path.display()))?;

    println!("Wrote {}", path.display());
    println!("Total number of transactions: {}", output.summary.transaction_count);
    println!("Total amount: {:.2}", output.summary.amount_total);

    Ok(())
}
