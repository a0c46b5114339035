//! Format classification
//!
//! Every input file is routed to exactly one processing lane based on its
//! extension. Classification is a pure function of the path string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Extensions routed to the speech-to-text converter (lowercase, no dot)
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "m4a", "flac"];

/// Extensions the generic converter understands (lowercase, no dot)
///
/// Anything outside both lists is still routed to the generic converter,
/// which decides whether it can handle it.
pub const TEXT_EXTENSIONS: [&str; 7] = ["pdf", "md", "markdown", "docx", "html", "htm", "txt"];

/// Processing lane for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Documents handled by structural parsing (PDF, DOCX, Markdown, HTML, text)
    Text,

    /// Recordings handled by speech recognition
    Audio,
}

impl DocumentKind {
    /// Classify a path by its extension
    pub fn classify(path: impl AsRef<Path>) -> Self {
        match lowercase_extension(path.as_ref()) {
            Some(ext) if AUDIO_EXTENSIONS.contains(&ext.as_str()) => DocumentKind::Audio,
            _ => DocumentKind::Text,
        }
    }

    /// Get the lane name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Text => "text",
            DocumentKind::Audio => "audio",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered input file with its lane fixed at classification time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    kind: DocumentKind,
}

impl SourceFile {
    /// Classify a path and wrap it
    pub fn classify(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = DocumentKind::classify(&path);
        Self { path, kind }
    }

    /// Full path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Processing lane
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// File name component, lossily converted
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File stem, used for export file names
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension with its leading dot as written on disk (`""` when absent)
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }

    /// Lowercase extension without the dot, used for converter dispatch
    pub fn normalized_extension(&self) -> Option<String> {
        lowercase_extension(&self.path)
    }

    /// Whether a known converter format claims this extension
    pub fn is_recognized(&self) -> bool {
        match self.normalized_extension() {
            Some(ext) => {
                AUDIO_EXTENSIONS.contains(&ext.as_str()) || TEXT_EXTENSIONS.contains(&ext.as_str())
            }
            None => false,
        }
    }
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_audio_extensions_are_audio() {
        for ext in AUDIO_EXTENSIONS {
            let path = format!("recordings/call.{}", ext);
            assert_eq!(DocumentKind::classify(&path), DocumentKind::Audio, "{}", path);
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(DocumentKind::classify("Q3_Call.MP3"), DocumentKind::Audio);
        assert_eq!(DocumentKind::classify("memo.FlAc"), DocumentKind::Audio);
    }

    #[test]
    fn test_everything_else_is_text() {
        assert_eq!(DocumentKind::classify("report.pdf"), DocumentKind::Text);
        assert_eq!(DocumentKind::classify("notes.md"), DocumentKind::Text);
        assert_eq!(DocumentKind::classify("archive.zip"), DocumentKind::Text);
        assert_eq!(DocumentKind::classify("Makefile"), DocumentKind::Text);
        assert_eq!(DocumentKind::classify(".mp3"), DocumentKind::Text);
    }

    #[test]
    fn test_only_final_extension_counts() {
        assert_eq!(DocumentKind::classify("clip.mp3.txt"), DocumentKind::Text);
        assert_eq!(DocumentKind::classify("notes.txt.wav"), DocumentKind::Audio);
    }

    #[test]
    fn test_source_file_accessors() {
        let file = SourceFile::classify("/data/raw/Annual Report.PDF");
        assert_eq!(file.name(), "Annual Report.PDF");
        assert_eq!(file.stem(), "Annual Report");
        assert_eq!(file.extension(), ".PDF");
        assert_eq!(file.normalized_extension().as_deref(), Some("pdf"));
        assert_eq!(file.kind(), DocumentKind::Text);
        assert!(file.is_recognized());
    }

    #[test]
    fn test_source_file_without_extension() {
        let file = SourceFile::classify("/data/raw/README");
        assert_eq!(file.extension(), "");
        assert!(file.normalized_extension().is_none());
        assert!(!file.is_recognized());
    }

    proptest! {
        #[test]
        fn classify_is_total_and_matches_audio_set(stem in "[a-zA-Z0-9_]{1,12}", ext in "[a-zA-Z0-9]{1,5}") {
            let path = format!("{}.{}", stem, ext);
            let expected = if AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                DocumentKind::Audio
            } else {
                DocumentKind::Text
            };
            prop_assert_eq!(DocumentKind::classify(&path), expected);
        }
    }
}
