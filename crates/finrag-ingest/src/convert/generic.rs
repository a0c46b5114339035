//! Generic structural converter for text-like formats

use super::{docx, html, markdown, pdf, DocumentConverter};
use crate::error::ConvertError;
use finrag_domain::{ConvertedDocument, DocItem, SourceFile};
use std::io;

/// Parses PDF, DOCX, Markdown, HTML and plain text into document items
#[derive(Debug, Default, Clone)]
pub struct GenericConverter;

impl GenericConverter {
    /// Create the converter
    pub fn new() -> Self {
        Self
    }

    /// Parse raw bytes as the given (lowercase, dotless) extension
    pub fn parse_bytes(&self, extension: &str, bytes: &[u8]) -> Result<Vec<DocItem>, ConvertError> {
        match extension {
            "pdf" => pdf::parse(bytes),
            "docx" => docx::parse(bytes),
            "md" | "markdown" => Ok(markdown::parse(&String::from_utf8_lossy(bytes))),
            "html" | "htm" => html::parse(&String::from_utf8_lossy(bytes)),
            "txt" => Ok(parse_plain_text(&String::from_utf8_lossy(bytes))),
            other => Err(ConvertError::Conversion(format!(
                "unsupported format '{}'",
                if other.is_empty() { "(none)" } else { other }
            ))),
        }
    }
}

impl DocumentConverter for GenericConverter {
    fn convert(&self, file: &SourceFile) -> Result<ConvertedDocument, ConvertError> {
        let bytes = std::fs::read(file.path()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConvertError::FileNotFound(file.path().to_path_buf()),
            _ => ConvertError::Io(e),
        })?;

        let extension = file.normalized_extension().unwrap_or_default();
        let items = self.parse_bytes(&extension, &bytes)?;

        let mut document = ConvertedDocument::new(file.name(), file.path(), file.kind());
        for item in items {
            document.push(item);
        }

        if document.is_empty() {
            return Err(ConvertError::Conversion(format!(
                "no text content extracted from {}",
                file.name()
            )));
        }
        Ok(document)
    }

    fn name(&self) -> &str {
        "generic"
    }
}

/// Blank-line separated paragraphs; line breaks inside a paragraph are kept
fn parse_plain_text(text: &str) -> Vec<DocItem> {
    let mut items = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !lines.is_empty() {
                items.push(DocItem::paragraph(lines.join("\n")));
                lines.clear();
            }
        } else {
            lines.push(line);
        }
    }
    if !lines.is_empty() {
        items.push(DocItem::paragraph(lines.join("\n")));
    }

    items
}
