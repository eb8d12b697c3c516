//! Recognizer tuning parameters and progress plumbing.

use std::sync::Arc;

/// Progress sink handed to [`Recognizer::recognize`](super::Recognizer::recognize).
///
/// Receives the recognizer's own completion fraction in `[0.0, 1.0]`.  It is
/// `'static` so it can be moved into whisper's progress callback.
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// A progress sink that drops every update.
pub fn no_progress() -> ProgressFn {
    Arc::new(|_| {})
}

/// Decoding strategy passed through to whisper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoding {
    /// Single pass, `best_of` candidates per step.
    Greedy { best_of: i32 },
    /// Beam search; more accurate, several times slower.
    BeamSearch { beam_size: i32, patience: f32 },
}

impl Default for Decoding {
    fn default() -> Self {
        Decoding::Greedy { best_of: 1 }
    }
}

/// Per-engine inference settings.  The language is supplied per call.
#[derive(Debug, Clone)]
pub struct RecognizerParams {
    pub decoding: Decoding,
    /// CPU threads handed to whisper.
    pub n_threads: i32,
}

impl Default for RecognizerParams {
    fn default() -> Self {
        Self {
            decoding: Decoding::default(),
            n_threads: optimal_threads(8),
        }
    }
}

/// Available parallelism capped at `cap` (at least 1).
pub fn optimal_threads(cap: usize) -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(cap.max(1)) as i32)
        .unwrap_or(4)
}
