// Field-level coercion and row validation
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;

use crate::types::{RawRow, TransactionRecord, TransactionTable};

/// Counters for rows removed during normalization, so failure rates
/// are observable instead of silently swallowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropStats {
    pub blank: usize,
    pub duplicate: usize,
    pub unparseable: usize,
}

/// Coerce raw rows into validated records.
///
/// Order matters: blank and duplicate rows are removed before type
/// coercion so formatting variants of the same row are not counted as
/// distinct, and unparseable rows are only dropped at the end so
/// partially-good rows are not discarded by the cheap filters.
pub fn normalize(rows: Vec<RawRow>) -> (TransactionTable, DropStats) {
    let mut stats = DropStats::default();

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut records = Vec::new();

    for row in rows {
        if row.is_blank() {
            stats.blank += 1;
            continue;
        }
        if !seen.insert(row.cells.clone()) {
            stats.duplicate += 1;
            continue;
        }

        let date = parse_date(row.cell(0));
        let amount = parse_amount(row.cell(2));
        match (date, amount) {
            (Some(date), Some(amount)) => records.push(TransactionRecord {
                date,
                description: row.cell(1).to_string(),
                amount,
            }),
            _ => stats.unparseable += 1,
        }
    }

    debug!(
        kept = records.len(),
        blank = stats.blank,
        duplicate = stats.duplicate,
        unparseable = stats.unparseable,
        "normalization complete"
    );

    (TransactionTable::new(records), stats)
}

/// Parse `DD/MM/YYYY` or `DD/MM/YY`. The format is chosen by the width
/// of the year segment; chrono's `%Y` would otherwise accept "24" as
/// the year 24 and two-digit years would never reach `%y`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let year_len = raw.rsplit('/').next().map_or(0, str::len);
    let format = if year_len == 4 { "%d/%m/%Y" } else { "%d/%m/%y" };
    NaiveDate::parse_from_str(raw, format).ok()
}

/// Parse a decimal amount, stripping everything except digits, one
/// decimal point and a leading minus sign. Currency markers and
/// thousands separators vanish; the last `.` wins as the decimal
/// separator (so the period in "Rs." cannot hijack it).
pub fn parse_amount(raw: &str) -> Option<f64> {
    let negative = raw
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .any(|c| c == '-');

    let stripped: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let (int_part, frac_part) = match stripped.rfind('.') {
        Some(idx) => (&stripped[..idx], &stripped[idx + 1..]),
        None => (stripped.as_str(), ""),
    };
    let int_digits: String = int_part.chars().filter(char::is_ascii_digit).collect();

    if int_digits.is_empty() && frac_part.is_empty() {
        return None;
    }

    let value: f64 = format!(
        "{}.{}",
        if int_digits.is_empty() { "0" } else { &int_digits },
        if frac_part.is_empty() { "0" } else { frac_part }
    )
    .parse()
    .ok()?;

    Some(if negative { -value } else { value })
}
