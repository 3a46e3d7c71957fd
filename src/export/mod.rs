// Export encoding: pure serialization of the normalized table
mod csv_export;
mod xlsx_export;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{OutputKind, PipelineError, TransactionTable};

/// Fixed output column order.
pub const COLUMNS: [&str; 3] = ["Date", "Description", "Amount"];

/// Rendered export: the bytes, a suggested filename and the MIME type
/// the shell should serve it with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Serialize the table in the requested format. No normalization
/// happens here.
pub fn encode(table: &TransactionTable, kind: OutputKind) -> Result<ExportArtifact, PipelineError> {
    match kind {
        OutputKind::Spreadsheet => Ok(ExportArtifact {
            bytes: xlsx_export::encode(table)?,
            filename: "processed_statement.xlsx".to_string(),
            content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                .to_string(),
        }),
        OutputKind::DelimitedText => Ok(ExportArtifact {
            bytes: csv_export::encode(table)?,
            filename: "processed_statement.csv".to_string(),
            content_type: "text/csv".to_string(),
        }),
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// Plain decimal, '.' separator, no thousands grouping.
pub(crate) fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_render_without_grouping() {
        assert_eq!(format_amount(1234.56), "1234.56");
        assert_eq!(format_amount(-500.0), "-500.00");
    }

    #[test]
    fn kind_selects_filename_and_content_type() {
        let table = TransactionTable::default();
        let xlsx = encode(&table, OutputKind::Spreadsheet).unwrap();
        assert_eq!(xlsx.filename, "processed_statement.xlsx");
        let csv = encode(&table, OutputKind::DelimitedText).unwrap();
        assert_eq!(csv.filename, "processed_statement.csv");
        assert_eq!(csv.content_type, "text/csv");
    }
}
