// Text-layer extraction from PDF content streams - pure Rust via lopdf
use anyhow::Result;
use lopdf::{Dictionary, Document, Object};

/// A run of text placed at one position on the page. Positions are in
/// PDF user space (origin bottom-left).
#[derive(Debug, Clone)]
pub struct TextFragment {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Rows are considered the same line when their baselines are within
/// this many points of each other.
pub const LINE_TOLERANCE: f32 = 3.0;

/// Extract positioned text fragments from one page's content stream.
///
/// This is a deliberately simple content-stream scanner: it tracks the
/// text position through Td/TD/Tm operators and emits one fragment per
/// Tj/TJ show operation. Good enough for statement layouts; it does not
/// attempt full graphics-state emulation.
pub fn extract_fragments(document: &Document, page: &Dictionary) -> Result<Vec<TextFragment>> {
    let mut fragments = Vec::new();

    let content_data = match page.get(b"Contents") {
        Ok(contents) => content_data(document, contents)?,
        Err(_) => return Ok(fragments),
    };

    let mut current_x = 0.0_f32;
    let mut current_y = 0.0_f32;

    let content_str = String::from_utf8_lossy(&content_data);
    for line in content_str.lines() {
        let line = line.trim();

        if line.ends_with(" Td") || line.ends_with(" TD") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 {
                if let (Ok(tx), Ok(ty)) = (parts[0].parse::<f32>(), parts[1].parse::<f32>()) {
                    current_x += tx;
                    current_y += ty;
                }
            }
        } else if line.ends_with(" Tm") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 7 {
                if let (Ok(e), Ok(f)) = (parts[4].parse::<f32>(), parts[5].parse::<f32>()) {
                    current_x = e;
                    current_y = f;
                }
            }
        } else if line.ends_with("TJ") {
            if let Some(text) = text_from_tj_array(line) {
                if !text.trim().is_empty() {
                    fragments.push(TextFragment { text, x: current_x, y: current_y });
                }
            }
        } else if line.ends_with("Tj") {
            if let Some(text) = text_from_tj(line) {
                if !text.trim().is_empty() {
                    fragments.push(TextFragment { text, x: current_x, y: current_y });
                }
            }
        }
    }

    Ok(fragments)
}

/// Group fragments into visual lines (top to bottom, left to right).
pub fn group_into_lines(fragments: &[TextFragment]) -> Vec<Vec<TextFragment>> {
    let mut sorted: Vec<TextFragment> = fragments.to_vec();
    // Top of page first; PDF y grows upward.
    sorted.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<Vec<TextFragment>> = Vec::new();
    for fragment in sorted {
        match lines.last_mut() {
            Some(line) if (line[0].y - fragment.y).abs() <= LINE_TOLERANCE => {
                line.push(fragment);
            }
            _ => lines.push(vec![fragment]),
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    lines
}

/// Flatten fragments to a plain text blob for line-based parsing.
pub fn fragments_to_text(fragments: &[TextFragment]) -> String {
    group_into_lines(fragments)
        .iter()
        .map(|line| {
            line.iter()
                .map(|f| f.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// Resolve a Contents entry (reference, stream, or array of streams)
// into one concatenated byte buffer.
fn content_data(document: &Document, contents: &Object) -> Result<Vec<u8>> {
    match contents {
        Object::Reference(r) => {
            let obj = document.get_object(*r)?;
            content_data(document, obj)
        }
        // decompressed_content errors on filterless streams; those are
        // already plain bytes.
        Object::Stream(stream) => {
            if stream.dict.has(b"Filter") {
                Ok(stream.decompressed_content()?)
            } else {
                Ok(stream.content.clone())
            }
        }
        Object::Array(arr) => {
            let mut data = Vec::new();
            for item in arr {
                data.extend_from_slice(&content_data(document, item)?);
            }
            Ok(data)
        }
        _ => Ok(Vec::new()),
    }
}

// Extract the string operand of a Tj operator.
fn text_from_tj(line: &str) -> Option<String> {
    let start = line.find('(')?;
    let end = line.rfind(')')?;
    if end > start {
        Some(decode_pdf_string(&line[start + 1..end]))
    } else {
        None
    }
}

// Extract and concatenate the string elements of a TJ array.
fn text_from_tj_array(line: &str) -> Option<String> {
    let start = line.find('[')?;
    let end = line.rfind(']')?;
    if end <= start {
        return None;
    }

    let mut result = String::new();
    let mut in_string = false;
    let mut current = String::new();
    for ch in line[start + 1..end].chars() {
        if ch == '(' {
            in_string = true;
            current.clear();
        } else if ch == ')' && in_string {
            in_string = false;
            result.push_str(&decode_pdf_string(&current));
        } else if in_string {
            current.push(ch);
        }
    }

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

// Minimal PDF literal-string decoder (escape sequences only).
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                match next {
                    'n' => result.push('\n'),
                    'r' => result.push('\r'),
                    't' => result.push('\t'),
                    '\\' | '(' | ')' => result.push(next),
                    _ => result.push(next),
                }
            }
        } else {
            result.push(ch);
        }
    }
    result
}
