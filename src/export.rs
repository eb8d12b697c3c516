//! Plain-text subtitle export.
//!
//! One block per segment:
//!
//! ```text
//! 00:00:01 - 00:00:04
//! こんにちは
//! 你好
//!
//! 00:00:04 - 00:00:07
//! ...
//! ```

use std::path::Path;

use thiserror::Error;

use crate::model::TranslationSegment;

/// Which text columns to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub original: bool,
    pub translated: bool,
}

impl ExportOptions {
    /// Original and translation.
    pub const BOTH: ExportOptions = ExportOptions {
        original: true,
        translated: true,
    };
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::BOTH
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("select at least one of original or translated text to export")]
    NothingSelected,

    #[error("could not write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Render `segments` as plain text.
///
/// The translation line is skipped when it repeats the original, unless it is
/// the only column selected.
///
/// ```
/// use subtitle_translator::export::{render_text, ExportOptions};
/// use subtitle_translator::model::{Language, TranscriptSegment};
///
/// let seg = TranscriptSegment::new(1.0, 4.2, "hello", Language::En)
///     .translated("你好", Language::Zh);
/// let text = render_text(&[seg], ExportOptions::BOTH).unwrap();
/// assert_eq!(text, "00:00:01 - 00:00:04\nhello\n你好\n");
/// ```
pub fn render_text(
    segments: &[TranslationSegment],
    options: ExportOptions,
) -> Result<String, ExportError> {
    if !options.original && !options.translated {
        return Err(ExportError::NothingSelected);
    }

    let mut lines: Vec<&str> = Vec::with_capacity(segments.len() * 4);
    let times: Vec<String> = segments
        .iter()
        .map(|s| format!("{} - {}", s.format_start_time(), s.format_end_time()))
        .collect();

    for (seg, time) in segments.iter().zip(&times) {
        lines.push(time);
        if options.original {
            lines.push(&seg.original);
        }
        if options.translated && (seg.translated != seg.original || !options.original) {
            lines.push(&seg.translated);
        }
        lines.push("");
    }
    Ok(lines.join("\n"))
}

/// Render and write to `path` (UTF-8), replacing any existing file.
pub fn write_text(
    path: impl AsRef<Path>,
    segments: &[TranslationSegment],
    options: ExportOptions,
) -> Result<(), ExportError> {
    let text = render_text(segments, options)?;
    std::fs::write(path.as_ref(), text)?;
    log::info!("export: wrote {} segment(s) to {}", segments.len(), path.as_ref().display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
