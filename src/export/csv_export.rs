// Delimited-text export
use crate::export::{format_amount, format_date, COLUMNS};
use crate::types::{PipelineError, TransactionTable};

pub fn encode(table: &TransactionTable) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(COLUMNS)
        .map_err(|e| PipelineError::Export(e.to_string()))?;

    for record in table.records() {
        writer
            .write_record(&[
                format_date(record.date),
                record.description.clone(),
                format_amount(record.amount),
            ])
            .map_err(|e| PipelineError::Export(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| PipelineError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionRecord;
    use chrono::NaiveDate;

    #[test]
    fn header_plus_one_record_is_two_lines() {
        let table = TransactionTable::new(vec![TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: "Grocery".to_string(),
            amount: 500.0,
        }]);

        let bytes = encode(&table).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Date,Description,Amount", "2024-01-01,Grocery,500.00"]);
    }

    #[test]
    fn commas_in_descriptions_are_quoted() {
        let table = TransactionTable::new(vec![TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            description: "AMAZON, MARKETPLACE".to_string(),
            amount: -12.5,
        }]);

        let text = String::from_utf8(encode(&table).unwrap()).unwrap();
        assert!(text.contains("\"AMAZON, MARKETPLACE\""));
        assert!(text.contains("-12.50"));
    }

    #[test]
    fn empty_table_is_just_the_header() {
        let text = String::from_utf8(encode(&TransactionTable::default()).unwrap()).unwrap();
        assert_eq!(text.trim_end(), "Date,Description,Amount");
    }
}
