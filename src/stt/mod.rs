//! Speech recognition collaborator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Recognizer (trait)                   │
//! │                                                      │
//! │   ┌─────────────┐    ┌───────────────────┐           │
//! │   │ ModelPaths  │    │ WhisperRecognizer │           │
//! │   │ - resolve   │───▶│ - ctx             │           │
//! │   │ - available?│    │ - params          │           │
//! │   └─────────────┘    └─────────┬─────────┘           │
//! │                                │                     │
//! │                                ▼                     │
//! │                 ┌──────────────────────────────┐     │
//! │                 │ recognize(.., prog, cancel)  │     │
//! │                 │ AudioData → [TranscriptSeg]  │     │
//! │                 └──────────────────────────────┘     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The handle is created once at startup and passed into every pipeline run
//! as an `Arc<dyn Recognizer>`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//! use subtitle_translator::audio::{AudioLoader, FileAudioLoader};
//! use subtitle_translator::model::Language;
//! use subtitle_translator::stt::{no_progress, Recognizer, RecognizerParams, WhisperRecognizer};
//!
//! let rec = WhisperRecognizer::load("models/ggml-medium.bin", RecognizerParams::default(), true)
//!     .expect("model not found");
//! let audio = FileAudioLoader::new().load(Path::new("talk.wav")).unwrap();
//! let cancel = CancellationToken::new();
//! for seg in rec.recognize(&audio, Language::Ja, no_progress(), &cancel).unwrap() {
//!     println!("{:.2}-{:.2} {}", seg.start, seg.end, seg.text);
//! }
//! ```

pub mod engine;
pub mod model;
pub mod transcribe;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{Recognizer, SttError, WhisperRecognizer};
pub use model::{find_model_by_id, ModelInfo, ModelPaths, ModelSize, WHISPER_MODELS};
pub use transcribe::{no_progress, optimal_threads, Decoding, ProgressFn, RecognizerParams};

#[cfg(test)]
pub use engine::MockRecognizer;
