//! Translation collaborator.
//!
//! # Architecture
//!
//! ```text
//! [TranscriptSegment] ──▶ Translator::translate_batch(source, target)
//!                              │
//!            source == target ─┼──▶ echo_segments (no backend call)
//!                              │
//!                              ▼
//!                     OllamaTranslator
//!                     ├─ chunks of batch_size
//!                     ├─ PromptBuilder::build_batch   "[n] text" lines
//!                     ├─ POST {base_url}/api/generate (retry + backoff)
//!                     └─ parse_numbered ──▶ missing lines echo original
//!                              │
//!                              ▼
//!                   [TranslationSegment] (same length and order)
//! ```

pub mod prompt;
pub mod translator;

pub use prompt::{parse_numbered, PromptBuilder};
pub use translator::{echo_segments, OllamaTranslator, TranslateError, Translator};

#[cfg(test)]
pub use translator::RecordingTranslator;
