//! Audio subtitle translator.
//!
//! Queue up to five audio files, recognise their speech, translate the
//! transcript and serve time-indexed captions during playback.
//!
//! ```text
//! queue ──▶ pipeline::Orchestrator ──▶ audio ─▶ stt ─▶ translate
//!                 │                                        │
//!                 └────────── cache (SubtitleTrack) ◀──────┘
//! ```

pub mod audio;
pub mod cache;
pub mod config;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod queue;
pub mod stt;
pub mod translate;
