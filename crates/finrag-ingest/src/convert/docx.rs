//! DOCX parsing via `docx-rs`

use super::normalize_whitespace;
use crate::error::ConvertError;
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild, Table};
use finrag_domain::{DocItem, ItemLabel};

pub(crate) fn parse(bytes: &[u8]) -> Result<Vec<DocItem>, ConvertError> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| ConvertError::Conversion(format!("failed to read DOCX: {}", e)))?;

    let mut items = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                let text = paragraph_text(paragraph);
                if text.is_empty() {
                    continue;
                }
                let style = paragraph.property.style.as_ref().map(|s| s.val.as_str());
                items.push(item_for_style(style, text));
            }
            DocumentChild::Table(table) => {
                let text = table_text(table);
                if !text.is_empty() {
                    items.push(DocItem::body(ItemLabel::Table, text));
                }
            }
            _ => {}
        }
    }

    Ok(items)
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push(' '),
                    _ => {}
                }
            }
        }
    }
    normalize_whitespace(&text)
}

#[allow(irrefutable_let_patterns)]
fn table_text(table: &Table) -> String {
    let mut rows = Vec::new();
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row else {
            continue;
        };
        let mut cells = Vec::new();
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            let mut cell_text = Vec::new();
            for content in &cell.children {
                if let docx_rs::TableCellContent::Paragraph(p) = content {
                    let text = paragraph_text(p);
                    if !text.is_empty() {
                        cell_text.push(text);
                    }
                }
            }
            cells.push(cell_text.join(" "));
        }
        if cells.iter().any(|c| !c.is_empty()) {
            rows.push(cells.join(" | "));
        }
    }
    rows.join("\n")
}

/// Map a Word paragraph style id to a document item
fn item_for_style(style: Option<&str>, text: String) -> DocItem {
    let Some(style) = style else {
        return DocItem::paragraph(text);
    };
    let style = style.to_lowercase().replace(' ', "");

    if style == "title" {
        return DocItem::title(text);
    }
    if let Some(level) = style.strip_prefix("heading").and_then(|n| n.parse::<u8>().ok()) {
        return DocItem::heading(text, level.clamp(1, 9));
    }
    if style.contains("list") {
        return DocItem::body(ItemLabel::ListItem, text);
    }
    DocItem::paragraph(text)
}
