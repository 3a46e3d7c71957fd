// Heuristic transaction-line parsing
//
// A line is a transaction candidate iff it carries a DD/MM/YY or
// DD/MM/YYYY date token. The amount is the first numeric token after
// the date; the description is the literal text between the two.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::RawRow;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2}/\d{2}/(?:\d{4}|\d{2})\b").unwrap());

// Optional currency marker, optional thousands separators, at most two
// decimal digits.
static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?:Rs\.?|INR|USD|EUR|GBP|\$|€|£)\s*)?-?\d+(?:,\d{3})*(?:\.\d{1,2})?")
        .unwrap()
});

/// Split one text line into a `[date, description, amount]` raw row.
///
/// Returns `None` for anything that does not look like a transaction
/// (headers, footers, running balances without dates). Ties break to
/// the FIRST date match and the FIRST amount match after it; lines with
/// embedded reference numbers can mis-parse, and that behavior is
/// pinned by tests rather than silently changed.
pub fn parse_transaction_line(line: &str) -> Option<RawRow> {
    let date = DATE_RE.find(line)?;
    let rest = &line[date.end()..];
    let amount = AMOUNT_RE.find(rest)?;

    let description = rest[..amount.start()].trim();
    Some(RawRow::new([
        date.as_str(),
        description,
        amount.as_str().trim(),
    ]))
}
