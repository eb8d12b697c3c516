//! Audio loading — file → decoded 16 kHz mono samples.
//!
//! # Pipeline
//!
//! ```text
//! path ─▶ FileAudioLoader::load ─▶ AudioData
//!           ├─ .wav → hound decode → downmix → resample_to_16k
//!           └─ .mp3 → size-based metadata, samples deferred
//! AudioData ─▶ prepare_samples ─▶ &[f32] for the recognizer
//!                 └─ deferred → ffmpeg → temp WAV → decode
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use subtitle_translator::audio::{prepare_samples, AudioLoader, FileAudioLoader};
//!
//! let audio = FileAudioLoader::new().load(Path::new("talk.wav")).unwrap();
//! let pcm = prepare_samples(&audio).unwrap();
//! println!("{:.1}s, {} samples @ 16 kHz", audio.duration_secs, pcm.len());
//! ```

pub mod convert;
pub mod loader;
pub mod resample;

pub use convert::prepare_samples;
pub use loader::{
    decode_wav, is_supported_format, AudioData, AudioError, AudioLoader, DecodedWav,
    FileAudioLoader, SUPPORTED_EXTENSIONS,
};
pub use resample::{downmix, int_to_f32, resample_to_16k, TARGET_RATE};

#[cfg(test)]
pub use loader::MockLoader;
