//! PDF text extraction
//!
//! `pdf-extract` yields the page text without structure, so headings are
//! recovered heuristically from short standalone blocks.

use super::normalize_whitespace;
use crate::error::ConvertError;
use finrag_domain::DocItem;

const MAX_HEADING_CHARS: usize = 80;
const MAX_HEADING_WORDS: usize = 10;

pub(crate) fn parse(bytes: &[u8]) -> Result<Vec<DocItem>, ConvertError> {
    // pdf-extract panics on some malformed inputs instead of returning an error
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ConvertError::Conversion("PDF parser panicked on malformed input".to_string()))?
        .map_err(|e| ConvertError::Conversion(format!("failed to extract PDF text: {}", e)))?;

    Ok(items_from_text(&text.replace('\0', "")))
}

/// Split extracted text into blocks and label them
pub(crate) fn items_from_text(text: &str) -> Vec<DocItem> {
    let mut items = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !block.is_empty() {
                items.push(classify_block(&block));
                block.clear();
            }
        } else {
            block.push(line.trim());
        }
    }

    items
}

fn classify_block(lines: &[&str]) -> DocItem {
    let text = normalize_whitespace(&lines.join(" "));
    if lines.len() == 1 {
        if let Some(level) = heading_level(&text) {
            return DocItem::heading(text, level);
        }
    }
    DocItem::paragraph(text)
}

/// Heading depth for a line that looks like a heading
fn heading_level(line: &str) -> Option<u8> {
    if line.chars().count() > MAX_HEADING_CHARS
        || line.split_whitespace().count() > MAX_HEADING_WORDS
        || line.ends_with(&['.', ',', ';', ':'][..])
    {
        return None;
    }

    if let Some((first, rest)) = line.split_once(' ') {
        if let Some(depth) = section_number_depth(first) {
            if rest.chars().any(char::is_alphabetic) {
                return Some(depth);
            }
        }
    }

    // single words count too: "REVENUE", "RISKS"
    let has_letters = line.chars().any(char::is_alphabetic);
    let all_caps = !line.chars().any(char::is_lowercase);
    (has_letters && all_caps).then_some(1)
}

/// `"2"`, `"2."` and `"2.1"` style section numbers; depth is the number of parts
fn section_number_depth(token: &str) -> Option<u8> {
    let token = token.trim_end_matches('.');
    if token.is_empty() {
        return None;
    }
    let parts: Vec<&str> = token.split('.').collect();
    if parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        u8::try_from(parts.len()).ok().map(|d| d.min(6))
    } else {
        None
    }
}
