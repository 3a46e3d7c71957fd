// Spreadsheet export
//
// Writes a minimal Open XML spreadsheet container by hand: content
// types, package relationships, a workbook with one sheet, and the
// worksheet itself with inline strings. No styles, no shared-string
// table - nothing a statement export needs.
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::export::{format_amount, format_date, COLUMNS};
use crate::types::{PipelineError, TransactionTable};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Transactions" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

pub fn encode(table: &TransactionTable) -> Result<Vec<u8>, PipelineError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let parts: [(&str, String); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", WORKBOOK.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", worksheet_xml(table)),
    ];

    for (name, body) in parts {
        zip.start_file(name, options)
            .map_err(|e| PipelineError::Export(e.to_string()))?;
        zip.write_all(body.as_bytes())
            .map_err(|e| PipelineError::Export(e.to_string()))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| PipelineError::Export(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn worksheet_xml(table: &TransactionTable) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>"#,
    );

    xml.push_str("<row r=\"1\">");
    for (col, label) in COLUMNS.iter().enumerate() {
        xml.push_str(&inline_string_cell(col, 1, label));
    }
    xml.push_str("</row>");

    for (i, record) in table.records().iter().enumerate() {
        let row = i + 2;
        xml.push_str(&format!("<row r=\"{row}\">"));
        xml.push_str(&inline_string_cell(0, row, &format_date(record.date)));
        xml.push_str(&inline_string_cell(1, row, &record.description));
        xml.push_str(&format!(
            "<c r=\"{}\" t=\"n\"><v>{}</v></c>",
            cell_ref(2, row),
            format_amount(record.amount)
        ));
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn inline_string_cell(col: usize, row: usize, value: &str) -> String {
    format!(
        "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
        cell_ref(col, row),
        escape_xml(value)
    )
}

// Column letters for the fixed three-column layout.
fn cell_ref(col: usize, row: usize) -> String {
    let letter = (b'A' + col as u8) as char;
    format!("{letter}{row}")
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionRecord;
    use chrono::NaiveDate;
    use std::io::Read;

    fn sample_table() -> TransactionTable {
        TransactionTable::new(vec![TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: "Grocery & Deli".to_string(),
            amount: 500.0,
        }])
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn produces_a_zip_container_with_the_expected_parts() {
        let bytes = encode(&sample_table()).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");

        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"[Content_Types].xml"));
        assert!(names.contains(&"xl/workbook.xml"));
        assert!(names.contains(&"xl/worksheets/sheet1.xml"));
    }

    #[test]
    fn worksheet_has_header_and_escaped_data() {
        let bytes = encode(&sample_table()).unwrap();
        let sheet = read_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("<t>Date</t>"));
        assert!(sheet.contains("<t>2024-01-01</t>"));
        assert!(sheet.contains("<t>Grocery &amp; Deli</t>"));
        assert!(sheet.contains("<c r=\"C2\" t=\"n\"><v>500.00</v></c>"));
    }

    #[test]
    fn cell_refs_walk_the_columns() {
        assert_eq!(cell_ref(0, 1), "A1");
        assert_eq!(cell_ref(2, 10), "C10");
    }
}
