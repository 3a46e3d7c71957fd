// billsnap - credit-card statement PDF to normalized transaction table
//
// The pipeline runs a cascade of extraction strategies (structured
// tables, text-line parsing, OCR), normalizes whatever came out into
// typed transaction records, and serializes the result as CSV or XLSX.
// Callers pass document bytes and an output kind; they get back a
// rendered artifact plus summary, or one typed failure.
pub mod export;
pub mod extract;
pub mod parse;
pub mod types;

use lopdf::Document;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use export::ExportArtifact;
pub use extract::{ExtractionStrategy, PageContent};
pub use types::{
    OutputKind, PipelineError, RawRow, Summary, TransactionRecord, TransactionTable,
};

/// Everything a successful run hands back to the presentation shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub artifact: ExportArtifact,
    pub summary: Summary,
    /// The normalized table itself, for previews.
    pub table: TransactionTable,
}

/// Process one statement document with the standard strategy cascade.
pub fn process_document(bytes: &[u8], kind: OutputKind) -> types::Result<ProcessOutput> {
    process_document_with_strategies(bytes, kind, extract::default_strategies())
}

/// Process one statement document with caller-supplied strategies.
/// The seam exists so tests can run the pipeline with OCR mocked out.
pub fn process_document_with_strategies(
    bytes: &[u8],
    kind: OutputKind,
    mut strategies: Vec<Box<dyn ExtractionStrategy>>,
) -> types::Result<ProcessOutput> {
    let document = Document::load_mem(bytes).map_err(PipelineError::MalformedDocument)?;

    let pages = extract::run_cascade(&document, &mut strategies);
    let raw_rows = parse::rows_from_pages(&pages);
    if raw_rows.is_empty() {
        return Err(PipelineError::NoTableFound);
    }

    let extracted = raw_rows.len();
    debug!(extracted, "raw rows recovered");

    let (table, stats) = parse::normalize::normalize(raw_rows);
    if table.is_empty() {
        return Err(PipelineError::AllRowsInvalid { extracted });
    }

    let summary = table.summary();
    info!(
        records = summary.transaction_count,
        dropped = stats.blank + stats.duplicate + stats.unparseable,
        "statement normalized"
    );

    let artifact = export::encode(&table, kind)?;
    Ok(ProcessOutput { artifact, summary, table })
}
