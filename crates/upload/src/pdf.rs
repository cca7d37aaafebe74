//! PDF text extraction
//!
//! Extracts text content from in-memory PDF buffers using lopdf. Pages whose
//! fonts lopdf cannot decode fall back to a scan of the raw content stream.

use crate::errors::ExtractionError;
use tracing::{debug, warn};

/// Extract text content from a PDF held in memory
pub fn extract_text_from_pdf(name: &str, data: &[u8]) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load_mem(data).map_err(|e| ExtractionError::PdfParse {
        name: name.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(file = name, page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for (page_num, page_id) in pages {
        let page_text = match doc.extract_text(&[page_num]) {
            Ok(t) if !t.trim().is_empty() => t,
            _ => match doc.get_page_content(page_id) {
                Ok(content) => extract_text_from_content(&content),
                Err(e) => {
                    warn!(file = name, page = page_num, error = %e, "Failed to read page content, skipping");
                    continue;
                }
            },
        };
        text.push_str(&page_text);
        text.push('\n');
    }

    let cleaned = clean_text(&text);
    if cleaned.is_empty() {
        return Err(ExtractionError::PdfParse {
            name: name.to_string(),
            message: "No text content extracted from PDF".to_string(),
        });
    }

    debug!(
        file = name,
        original_len = text.len(),
        cleaned_len = cleaned.len(),
        "PDF text extraction complete"
    );

    Ok(cleaned)
}

/// Extract text from a PDF content stream by reading the text-showing
/// operators between BT and ET.
fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        match trimmed {
            "BT" => {
                in_text_block = true;
            }
            "ET" => {
                in_text_block = false;
                if !current_text.is_empty() {
                    text.push_str(&current_text);
                    text.push('\n');
                    current_text.clear();
                }
            }
            _ if in_text_block => {
                if let Some(shown) = extract_text_from_operator(trimmed) {
                    current_text.push_str(&shown);
                }
            }
            _ => {}
        }
    }

    text
}

/// Extract the string operands of `Tj`, `'`, `"` and `TJ`
fn extract_text_from_operator(line: &str) -> Option<String> {
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut depth = 0usize;
        let mut escaped = false;
        let mut current = String::new();

        for ch in line.chars() {
            if depth > 0 && escaped {
                current.push('\\');
                current.push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '\\' if depth > 0 => escaped = true,
                '(' => {
                    if depth > 0 {
                        current.push(ch);
                    }
                    depth += 1;
                }
                ')' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        result.push_str(&decode_pdf_string(&current));
                        current.clear();
                    } else {
                        current.push(ch);
                    }
                }
                _ if depth > 0 => current.push(ch),
                _ => {}
            }
        }

        return if result.is_empty() { None } else { Some(result) };
    }

    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        let start = line.find('(')?;
        let end = line.rfind(')')?;
        if end > start {
            return Some(decode_pdf_string(&line[start + 1..end]));
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some(d) if d.is_digit(8) => {
                // Up to three octal digits
                let mut code = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(v) => {
                            code = code * 8 + v;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if let Some(c) = char::from_u32(code) {
                    result.push(c);
                }
            }
            Some(c) => result.push(c),
            None => {}
        }
    }

    result
}

/// Collapse runs of whitespace inside lines, drop blank lines and strip
/// byte-order marks.
pub(crate) fn clean_text(text: &str) -> String {
    text.replace('\u{FEFF}', "")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
