//! Core data types shared by every stage of the pipeline.
//!
//! * [`Language`] — the four languages the recognizer supports.
//! * [`TranscriptSegment`] — one time-aligned chunk of recognized speech.
//! * [`TranslationSegment`] — a transcript segment paired with its translation.
//! * [`TranslationResult`] — a finished file's segments plus provenance, with
//!   JSON round-tripping.

pub mod language;
pub mod segment;

pub use language::{Language, LanguageError};
pub use segment::{format_timestamp, TranscriptSegment, TranslationResult, TranslationSegment};
