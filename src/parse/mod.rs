// Raw-row recovery from extracted page content
pub mod line_parser;
pub mod normalize;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::extract::PageContent;
use crate::types::RawRow;

static DATE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)date").unwrap());
static AMOUNT_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)amount|price|cost").unwrap());
static DESC_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)desc|detail|narration|particular").unwrap());

/// Turn page contents into canonical `[date, description, amount]`
/// rows. Structured tables are column-mapped; text blobs go through
/// the line parser. The header row is recognized by position - first
/// row of the first table only.
pub fn rows_from_pages(pages: &[PageContent]) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let mut first_table = true;

    for page in pages {
        match page {
            PageContent::Table(table_rows) => {
                rows.extend(map_table_rows(table_rows, first_table));
                first_table = false;
            }
            PageContent::Text(blob) => {
                let before = rows.len();
                rows.extend(blob.lines().filter_map(line_parser::parse_transaction_line));
                debug!(matched = rows.len() - before, "text page line-parsed");
            }
        }
    }

    rows
}

// Map a cell grid to three-field rows. When the first row of the first
// table carries recognizable labels it names the columns; otherwise
// canonical Date/Description/Amount labels are assigned positionally.
fn map_table_rows(table_rows: &[RawRow], allow_header: bool) -> Vec<RawRow> {
    if table_rows.is_empty() {
        return Vec::new();
    }

    let header = table_rows.first().filter(|_| allow_header).and_then(|row| {
        let date = row.cells.iter().position(|c| DATE_LABEL.is_match(c))?;
        let amount = row.cells.iter().position(|c| AMOUNT_LABEL.is_match(c))?;
        let description = row
            .cells
            .iter()
            .position(|c| DESC_LABEL.is_match(c))
            .or_else(|| (0..row.cells.len()).find(|&i| i != date && i != amount));
        Some((date, description, amount))
    });

    match header {
        Some((date, description, amount)) => table_rows[1..]
            .iter()
            .map(|row| {
                RawRow::new([
                    row.cell(date),
                    description.map(|i| row.cell(i)).unwrap_or(""),
                    row.cell(amount),
                ])
            })
            .collect(),
        None => table_rows
            .iter()
            .map(|row| RawRow::new([row.cell(0), row.cell(1), row.cell(2)]))
            .collect(),
    }
}
