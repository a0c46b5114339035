//! Converter adapter
//!
//! Two converters sit behind one call shape: a generic structural parser for
//! PDF/DOCX/Markdown/HTML/plain text and a speech-to-text converter for audio.
//! Each is built on first use and then shared for the life of the
//! [`ConverterSet`], so a run that never sees an audio file never pays for
//! the audio toolchain.

mod audio;
mod docx;
mod generic;
mod html;
mod markdown;
mod pdf;

pub use audio::AudioConverter;
pub use generic::GenericConverter;

use crate::config::AsrOptions;
use crate::error::ConvertError;
use finrag_domain::{ConvertedDocument, DocumentKind, SourceFile};
use std::sync::OnceLock;
use tracing::debug;

/// Turns one source file into a structured document
pub trait DocumentConverter: Send + Sync {
    /// Convert the file
    fn convert(&self, file: &SourceFile) -> Result<ConvertedDocument, ConvertError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

type Factory = Box<dyn Fn() -> Box<dyn DocumentConverter> + Send + Sync>;

/// Lazily constructed pair of converters, selected by [`DocumentKind`]
pub struct ConverterSet {
    generic: OnceLock<Box<dyn DocumentConverter>>,
    audio: OnceLock<Box<dyn DocumentConverter>>,
    generic_factory: Factory,
    audio_factory: Factory,
}

impl ConverterSet {
    /// Standard converters; the audio converter is fixed to `asr`
    pub fn new(asr: AsrOptions) -> Self {
        Self::with_factories(
            || Box::new(GenericConverter::new()),
            move || Box::new(AudioConverter::new(asr.clone())),
        )
    }

    /// Build converters from custom factories (each called at most once)
    pub fn with_factories<G, A>(generic: G, audio: A) -> Self
    where
        G: Fn() -> Box<dyn DocumentConverter> + Send + Sync + 'static,
        A: Fn() -> Box<dyn DocumentConverter> + Send + Sync + 'static,
    {
        Self {
            generic: OnceLock::new(),
            audio: OnceLock::new(),
            generic_factory: Box::new(generic),
            audio_factory: Box::new(audio),
        }
    }

    /// Convert a classified file with the converter for its lane
    pub fn convert(&self, file: &SourceFile) -> Result<ConvertedDocument, ConvertError> {
        if !file.path().is_file() {
            return Err(ConvertError::FileNotFound(file.path().to_path_buf()));
        }

        let converter = self.converter_for(file.kind());
        debug!(file = %file.name(), converter = converter.name(), "converting");
        converter.convert(file)
    }

    /// The converter that handles `kind`, constructing it on first use
    pub fn converter_for(&self, kind: DocumentKind) -> &dyn DocumentConverter {
        let converter = match kind {
            DocumentKind::Text => self.generic.get_or_init(|| (self.generic_factory)()),
            DocumentKind::Audio => self.audio.get_or_init(|| (self.audio_factory)()),
        };
        converter.as_ref()
    }

    /// Which converters have been built so far, as `(generic, audio)`
    pub fn initialized(&self) -> (bool, bool) {
        (self.generic.get().is_some(), self.audio.get().is_some())
    }
}

impl Default for ConverterSet {
    fn default() -> Self {
        Self::new(AsrOptions::default())
    }
}

impl std::fmt::Debug for ConverterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (generic, audio) = self.initialized();
        f.debug_struct("ConverterSet")
            .field("generic_initialized", &generic)
            .field("audio_initialized", &audio)
            .finish()
    }
}

/// Collapse runs of whitespace into single spaces
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
