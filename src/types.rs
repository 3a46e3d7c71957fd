// Core types for the statement extraction pipeline
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Untyped row of text cells as produced by table extraction or line
/// splitting. Transient; consumed by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(|c| c.into().trim().to_string()).collect(),
        }
    }

    /// A row with no content in any cell contributes nothing.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// One validated statement transaction. Only constructed when both the
/// date and the amount parsed successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

/// Ordered, deduplicated set of transactions for one statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionTable {
    records: Vec<TransactionRecord>,
}

impl TransactionTable {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            transaction_count: self.records.len(),
            amount_total: self.records.iter().map(|r| r.amount).sum(),
        }
    }
}

/// Statistics shown to the caller alongside the export artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub transaction_count: usize,
    pub amount_total: f64,
}

/// Requested export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    /// Open XML spreadsheet (.xlsx), one sheet.
    Spreadsheet,
    /// Comma-separated values (.csv).
    DelimitedText,
}

/// Failure taxonomy surfaced to the presentation shell. Per-line and
/// per-row parse failures stay local and never reach here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("not a valid PDF document: {0}")]
    MalformedDocument(#[source] lopdf::Error),

    #[error("no transaction data found in the document")]
    NoTableFound,

    #[error("{extracted} rows were extracted but none had a parseable date and amount")]
    AllRowsInvalid { extracted: usize },

    #[error("failed to encode export: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
