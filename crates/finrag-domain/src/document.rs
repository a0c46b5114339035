//! Structured, format-agnostic document representation
//!
//! Converters flatten every input format into an ordered list of labelled
//! items. Headings carry a level so the chunker can rebuild the section
//! hierarchy without knowing where the document came from.

use crate::format::DocumentKind;
use std::path::PathBuf;

/// Structural role of a document item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemLabel {
    /// Document title (outermost heading)
    Title,
    /// Section heading; see [`DocItem::level`]
    SectionHeader,
    /// Body paragraph
    Paragraph,
    /// Bulleted or numbered list entry
    ListItem,
    /// Whole table, rows joined with newlines
    Table,
    /// Preformatted or code block
    Code,
    /// One timestamped speech segment
    Transcript,
}

impl ItemLabel {
    /// Whether this item opens a section rather than carrying body text
    pub fn is_heading(&self) -> bool {
        matches!(self, ItemLabel::Title | ItemLabel::SectionHeader)
    }

    /// Whether the chunker must keep this item whole
    pub fn is_atomic(&self) -> bool {
        matches!(self, ItemLabel::Table | ItemLabel::Code)
    }
}

/// A single labelled unit of document content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocItem {
    /// Structural role
    pub label: ItemLabel,

    /// Text content
    pub text: String,

    /// Heading depth (1 = top level); 0 for non-heading items
    pub level: u8,
}

impl DocItem {
    /// Create a document title
    pub fn title(text: impl Into<String>) -> Self {
        Self { label: ItemLabel::Title, text: text.into(), level: 1 }
    }

    /// Create a section heading at the given depth
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Self { label: ItemLabel::SectionHeader, text: text.into(), level }
    }

    /// Create a body paragraph
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::body(ItemLabel::Paragraph, text)
    }

    /// Create a non-heading item with the given label
    pub fn body(label: ItemLabel, text: impl Into<String>) -> Self {
        Self { label, text: text.into(), level: 0 }
    }

    /// Create a transcript segment with its time span in seconds
    pub fn transcript(start: f64, end: f64, text: &str) -> Self {
        Self::body(
            ItemLabel::Transcript,
            format!("[time: {:.2}-{:.2}]  {}", start, end, text.trim()),
        )
    }
}

/// Output of a converter: the document's content in reading order
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedDocument {
    /// Display name (usually the source file name)
    pub name: String,

    /// Path the document was converted from
    pub origin: PathBuf,

    /// Lane the document came through
    pub kind: DocumentKind,

    /// Items in document order
    pub items: Vec<DocItem>,
}

impl ConvertedDocument {
    /// Create an empty document
    pub fn new(name: impl Into<String>, origin: impl Into<PathBuf>, kind: DocumentKind) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            kind,
            items: Vec::new(),
        }
    }

    /// Append an item, skipping whitespace-only text
    pub fn push(&mut self, item: DocItem) {
        if !item.text.trim().is_empty() {
            self.items.push(item);
        }
    }

    /// Builder-style [`push`](Self::push)
    pub fn with_item(mut self, item: DocItem) -> Self {
        self.push(item);
        self
    }

    /// Whether the document has no content at all
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total characters of item text
    pub fn content_length(&self) -> usize {
        self.items.iter().map(|i| i.text.chars().count()).sum()
    }

    /// Number of timestamped transcript segments
    pub fn timestamp_segments(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.label == ItemLabel::Transcript && i.text.starts_with("[time:"))
            .count()
    }

    /// Check the structural invariants the chunker relies on
    pub fn validate(&self) -> Result<(), String> {
        for (position, item) in self.items.iter().enumerate() {
            if item.text.trim().is_empty() {
                return Err(format!("item {} ({:?}) has no text", position, item.label));
            }
            if item.label.is_heading() && item.level == 0 {
                return Err(format!("heading at item {} has level 0", position));
            }
        }
        Ok(())
    }

    /// Render the document as Markdown
    pub fn to_markdown(&self) -> String {
        let mut blocks = Vec::with_capacity(self.items.len());

        for item in &self.items {
            let block = match item.label {
                ItemLabel::Title => format!("# {}", item.text.trim()),
                ItemLabel::SectionHeader => {
                    let depth = usize::from(item.level.clamp(1, 6));
                    format!("{} {}", "#".repeat(depth), item.text.trim())
                }
                ItemLabel::ListItem => format!("- {}", item.text.trim()),
                ItemLabel::Code => format!("```\n{}\n```", item.text.trim_end()),
                ItemLabel::Paragraph | ItemLabel::Table | ItemLabel::Transcript => {
                    item.text.trim().to_string()
                }
            };
            blocks.push(block);
        }

        let mut markdown = blocks.join("\n\n");
        if !markdown.is_empty() {
            markdown.push('\n');
        }
        markdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConvertedDocument {
        ConvertedDocument::new("report.pdf", "/raw/report.pdf", DocumentKind::Text)
            .with_item(DocItem::title("Annual Report"))
            .with_item(DocItem::heading("Revenue", 2))
            .with_item(DocItem::paragraph("Revenue grew 12%."))
            .with_item(DocItem::body(ItemLabel::ListItem, "Segment A"))
            .with_item(DocItem::body(ItemLabel::Code, "let x = 1;"))
    }

    #[test]
    fn test_push_skips_blank_items() {
        let mut doc = ConvertedDocument::new("a.txt", "a.txt", DocumentKind::Text);
        doc.push(DocItem::paragraph("   \n"));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_content_length_counts_chars() {
        let doc = ConvertedDocument::new("a.txt", "a.txt", DocumentKind::Text)
            .with_item(DocItem::paragraph("héllo"))
            .with_item(DocItem::paragraph("world"));
        assert_eq!(doc.content_length(), 10);
    }

    #[test]
    fn test_markdown_rendering() {
        let markdown = sample().to_markdown();
        assert!(markdown.starts_with("# Annual Report\n\n## Revenue\n\nRevenue grew 12%."));
        assert!(markdown.contains("- Segment A"));
        assert!(markdown.contains("```\nlet x = 1;\n```"));
        assert!(markdown.ends_with('\n'));
    }

    #[test]
    fn test_transcript_segments() {
        let doc = ConvertedDocument::new("call.mp3", "call.mp3", DocumentKind::Audio)
            .with_item(DocItem::transcript(0.0, 4.5, " Welcome to the call. "))
            .with_item(DocItem::transcript(4.5, 9.25, "Revenue was up."));
        assert_eq!(doc.timestamp_segments(), 2);
        assert_eq!(doc.items[0].text, "[time: 0.00-4.50]  Welcome to the call.");
    }

    #[test]
    fn test_validate_rejects_level_zero_heading() {
        let mut doc = sample();
        doc.items.push(DocItem { label: ItemLabel::SectionHeader, text: "Bad".into(), level: 0 });
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        let mut doc = sample();
        doc.items.push(DocItem::paragraph(""));
        assert!(doc.validate().unwrap_err().contains("no text"));
    }

    #[test]
    fn test_valid_document() {
        assert!(sample().validate().is_ok());
    }
}
