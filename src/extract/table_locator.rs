// Structured table detection over positioned text fragments
use crate::extract::pdf_text::{group_into_lines, TextFragment};
use crate::types::RawRow;

/// Fragments whose x starts are within this many points snap to the
/// same column.
const COLUMN_TOLERANCE: f32 = 6.0;

/// Minimum shape before a fragment grid is treated as a table.
const MIN_TABLE_ROWS: usize = 2;
const MIN_TABLE_COLS: usize = 2;

/// Attempt layout-based table recovery from a page's text fragments.
///
/// Returns the cell grid when the page looks tabular (at least two rows
/// spread over at least two aligned columns), `None` otherwise. Pages
/// that fail this test fall back to line-based parsing.
pub fn detect_table(fragments: &[TextFragment]) -> Option<Vec<RawRow>> {
    let lines = group_into_lines(fragments);
    if lines.len() < MIN_TABLE_ROWS {
        return None;
    }

    let columns = cluster_columns(&lines);
    if columns.len() < MIN_TABLE_COLS {
        return None;
    }

    // Require real column structure: at least two lines must occupy two
    // or more distinct columns, otherwise this is just indented prose.
    let multi_cell_lines = lines
        .iter()
        .filter(|line| occupied_columns(line, &columns) >= MIN_TABLE_COLS)
        .count();
    if multi_cell_lines < MIN_TABLE_ROWS {
        return None;
    }

    let mut rows = Vec::with_capacity(lines.len());
    for line in &lines {
        let mut cells = vec![String::new(); columns.len()];
        for fragment in line {
            let col = nearest_column(fragment.x, &columns);
            if !cells[col].is_empty() {
                cells[col].push(' ');
            }
            cells[col].push_str(fragment.text.trim());
        }
        rows.push(RawRow::new(cells));
    }

    Some(rows)
}

// Cluster fragment x starts into column positions, merging starts that
// fall within COLUMN_TOLERANCE of each other.
fn cluster_columns(lines: &[Vec<TextFragment>]) -> Vec<f32> {
    let mut starts: Vec<f32> = lines
        .iter()
        .flat_map(|line| line.iter().map(|f| f.x))
        .collect();
    starts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut columns: Vec<f32> = Vec::new();
    for x in starts {
        match columns.last() {
            Some(&last) if x - last <= COLUMN_TOLERANCE => {}
            _ => columns.push(x),
        }
    }
    columns
}

fn nearest_column(x: f32, columns: &[f32]) -> usize {
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn occupied_columns(line: &[TextFragment], columns: &[f32]) -> usize {
    let mut seen = vec![false; columns.len()];
    for fragment in line {
        seen[nearest_column(fragment.x, columns)] = true;
    }
    seen.iter().filter(|&&s| s).count()
}
