//! Speech-to-text conversion
//!
//! Audio is decoded to 16 kHz mono WAV with `ffmpeg` and transcribed by the
//! `whisper` command-line tool; each recognised segment becomes one
//! timestamped transcript item. Both programs run in a scratch directory
//! that is removed when conversion finishes.

use super::DocumentConverter;
use crate::config::AsrOptions;
use crate::error::ConvertError;
use finrag_domain::{ConvertedDocument, DocItem, ItemLabel, SourceFile};
use serde::Deserialize;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

const WAV_NAME: &str = "audio.wav";
const TRANSCRIPT_NAME: &str = "audio.json";

/// Whisper JSON output (only the fields used here)
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Transcribes audio files with a fixed ASR configuration
#[derive(Debug, Clone)]
pub struct AudioConverter {
    options: AsrOptions,
}

impl AudioConverter {
    /// Create a converter; options cannot change afterwards
    pub fn new(options: AsrOptions) -> Self {
        Self { options }
    }

    /// ASR options in use
    pub fn options(&self) -> &AsrOptions {
        &self.options
    }

    fn decode(&self, input: &Path, wav: &Path) -> Result<(), ConvertError> {
        let args: Vec<&OsStr> = vec![
            OsStr::new("-nostdin"),
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-y"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-ac"),
            OsStr::new("1"),
            OsStr::new("-ar"),
            OsStr::new("16000"),
            wav.as_os_str(),
        ];
        run_tool(
            &self.options.ffmpeg_program,
            &args,
            "FFmpeg is required for audio files",
        )
    }

    fn transcribe(&self, wav: &Path, output_dir: &Path) -> Result<WhisperOutput, ConvertError> {
        let mut args: Vec<&OsStr> = vec![
            wav.as_os_str(),
            OsStr::new("--model"),
            OsStr::new(&self.options.model),
            OsStr::new("--task"),
            OsStr::new("transcribe"),
            OsStr::new("--output_format"),
            OsStr::new("json"),
            OsStr::new("--output_dir"),
            output_dir.as_os_str(),
            OsStr::new("--verbose"),
            OsStr::new("False"),
        ];
        if let Some(language) = &self.options.language {
            args.push(OsStr::new("--language"));
            args.push(OsStr::new(language));
        }
        run_tool(
            &self.options.whisper_program,
            &args,
            "install openai-whisper to transcribe audio",
        )?;

        let json = std::fs::read_to_string(output_dir.join(TRANSCRIPT_NAME))
            .map_err(|e| ConvertError::Conversion(format!("whisper produced no transcript: {}", e)))?;
        serde_json::from_str(&json)
            .map_err(|e| ConvertError::Conversion(format!("unreadable whisper output: {}", e)))
    }
}

impl DocumentConverter for AudioConverter {
    fn convert(&self, file: &SourceFile) -> Result<ConvertedDocument, ConvertError> {
        if !file.path().is_file() {
            return Err(ConvertError::FileNotFound(file.path().to_path_buf()));
        }

        let workdir = tempfile::tempdir()?;
        let wav = workdir.path().join(WAV_NAME);

        self.decode(file.path(), &wav)?;
        debug!(file = %file.name(), "decoded audio");
        let output = self.transcribe(&wav, workdir.path())?;
        debug!(file = %file.name(), segments = output.segments.len(), "transcribed audio");

        let document = transcript_document(file, output);
        if document.is_empty() {
            return Err(ConvertError::Conversion(format!(
                "no speech recognized in {}",
                file.name()
            )));
        }
        Ok(document)
    }

    fn name(&self) -> &str {
        "audio"
    }
}

fn transcript_document(file: &SourceFile, output: WhisperOutput) -> ConvertedDocument {
    let mut document = ConvertedDocument::new(file.name(), file.path(), file.kind());
    if output.segments.is_empty() {
        document.push(DocItem::body(ItemLabel::Transcript, output.text.trim()));
    } else {
        for segment in &output.segments {
            document.push(DocItem::transcript(segment.start, segment.end, &segment.text));
        }
    }
    document
}

/// Run an external program; a program that cannot be found is a missing dependency
fn run_tool(program: &str, args: &[&OsStr], hint: &str) -> Result<(), ConvertError> {
    let output = Command::new(program).args(args).output().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConvertError::MissingDependency {
            tool: program.to_string(),
            hint: hint.to_string(),
        },
        _ => ConvertError::Conversion(format!("failed to run {}: {}", program, e)),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("no output");
        return Err(ConvertError::Conversion(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            detail.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with(ffmpeg: &str, whisper: &str) -> AsrOptions {
        AsrOptions {
            ffmpeg_program: ffmpeg.to_string(),
            whisper_program: whisper.to_string(),
            ..AsrOptions::default()
        }
    }

    #[test]
    fn test_missing_ffmpeg_is_missing_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp3");
        std::fs::write(&clip, b"ID3\x03\x00").unwrap();

        let converter = AudioConverter::new(options_with("finrag-no-such-ffmpeg", "whisper"));
        let result = converter.convert(&SourceFile::classify(&clip));

        match result {
            Err(ConvertError::MissingDependency { tool, .. }) => {
                assert_eq!(tool, "finrag-no-such-ffmpeg")
            }
            other => panic!("expected MissingDependency, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tool_is_conversion_error() {
        let result = run_tool("false", &[], "n/a");
        assert!(matches!(result, Err(ConvertError::Conversion(_))));
    }

    #[test]
    fn test_segments_become_transcript_items() {
        let output: WhisperOutput = serde_json::from_str(
            r#"{"text": " Good morning. Revenue was up.", "segments": [
                {"id": 0, "start": 0.0, "end": 2.5, "text": " Good morning."},
                {"id": 1, "start": 2.5, "end": 4.75, "text": " Revenue was up."}
            ], "language": "en"}"#,
        )
        .unwrap();

        let file = SourceFile::classify("/calls/q3.m4a");
        let doc = transcript_document(&file, output);

        assert_eq!(doc.timestamp_segments(), 2);
        assert_eq!(doc.items[0].text, "[time: 0.00-2.50]  Good morning.");
        assert_eq!(doc.items[1].text, "[time: 2.50-4.75]  Revenue was up.");
    }

    #[test]
    fn test_text_without_segments() {
        let output: WhisperOutput = serde_json::from_str(r#"{"text": "Hello."}"#).unwrap();
        let doc = transcript_document(&SourceFile::classify("a.wav"), output);
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.timestamp_segments(), 0);
    }
}
