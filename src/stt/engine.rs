//! Recognizer trait and implementations.
//!
//! # Overview
//!
//! [`Recognizer`] is the interface the pipeline uses.  It is object-safe and
//! `Send + Sync` so one handle can be created at startup and shared as an
//! `Arc<dyn Recognizer>` by every pipeline run.
//!
//! [`WhisperRecognizer`] is the production implementation wrapping a
//! `whisper_rs::WhisperContext`.  Construct it with [`WhisperRecognizer::load`].
//!
//! [`MockRecognizer`] (available under `#[cfg(test)]`) returns canned segments
//! and counts calls, so the pipeline can be tested without a model file.

use std::path::Path;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::audio::{prepare_samples, AudioData, AudioError};
use crate::model::{Language, TranscriptSegment};
use crate::stt::transcribe::{Decoding, ProgressFn, RecognizerParams};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the recognition subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// PCM could not be produced for the loaded file (e.g. `ffmpeg` missing).
    #[error("audio preparation failed: {0}")]
    AudioPreparation(#[from] AudioError),

    /// An error occurred during the inference pass.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Inference finished but produced no non-empty segment.
    #[error("no speech detected")]
    NoSpeech,

    /// `cancel` fired before recognition finished.
    #[error("recognition cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Recognizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech recognizers.
///
/// # Contract
///
/// - Blocking; the pipeline calls it from the blocking thread pool.
/// - `on_progress` receives non-decreasing fractions in `[0.0, 1.0]`.
/// - The returned segments are ordered by start time and carry `language`.
/// - Once `cancel` fires the call returns [`SttError::Cancelled`] promptly;
///   no work continues after it returns.
pub trait Recognizer: Send + Sync {
    fn recognize(
        &self,
        audio: &AudioData,
        language: Language,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranscriptSegment>, SttError>;
}

// Compile-time assertion: Box<dyn Recognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Recognizer>) {}
};

// ---------------------------------------------------------------------------
// WhisperRecognizer
// ---------------------------------------------------------------------------

/// Production recognizer backed by whisper.cpp.
///
/// A new `WhisperState` is created for every call, so the context is loaded
/// once and shared without locking.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
    params: RecognizerParams,
}

impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperRecognizer {}
unsafe impl Sync for WhisperRecognizer {}

impl WhisperRecognizer {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`] — `model_path` does not exist.
    /// - [`SttError::ContextInit`]  — whisper-rs failed to load the file.
    pub fn load(
        model_path: impl AsRef<Path>,
        params: RecognizerParams,
        use_gpu: bool,
    ) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu = use_gpu;
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        log::info!("stt: loaded {} (gpu: {use_gpu})", path.display());
        Ok(Self { ctx, params })
    }

    fn full_params(
        &self,
        language: Language,
        on_progress: ProgressFn,
        cancel: CancellationToken,
    ) -> FullParams<'static, 'static> {
        use whisper_rs::SamplingStrategy as WS;
        let strategy = match self.params.decoding {
            Decoding::Greedy { best_of } => WS::Greedy { best_of },
            Decoding::BeamSearch { beam_size, patience } => WS::BeamSearch { beam_size, patience },
        };

        let mut fp = FullParams::new(strategy);
        fp.set_language(Some(language.code()));
        fp.set_n_threads(self.params.n_threads);
        fp.set_print_progress(false);
        fp.set_print_realtime(false);
        fp.set_print_special(false);
        fp.set_print_timestamps(false);

        // whisper reports 0..=100; map into the 0.3..0.9 slice of our range.
        fp.set_progress_callback_safe(move |percent: i32| {
            let pct = percent.clamp(0, 100) as f32 / 100.0;
            on_progress(0.3 + 0.6 * pct);
        });
        // Polled by whisper.cpp between decoder steps.
        fp.set_abort_callback_safe(move || cancel.is_cancelled());
        fp
    }
}

impl Recognizer for WhisperRecognizer {
    fn recognize(
        &self,
        audio: &AudioData,
        language: Language,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranscriptSegment>, SttError> {
        let check = || {
            if cancel.is_cancelled() {
                Err(SttError::Cancelled)
            } else {
                Ok(())
            }
        };
        check()?;
        on_progress(0.1);

        let samples = prepare_samples(audio)?;
        check()?;
        on_progress(0.25);

        let fp = self.full_params(language, on_progress.clone(), cancel.clone());
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        on_progress(0.3);
        let outcome = state.full(fp, &samples);
        check()?;
        outcome.map_err(|e| SttError::Transcription(e.to_string()))?;
        on_progress(0.9);

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut segments = Vec::with_capacity(n_segments.max(0) as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            // Timestamps are in centiseconds.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as f64 / 100.0;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as f64 / 100.0;
            segments.push(TranscriptSegment::new(t0, t1, text, language));
        }

        if segments.is_empty() {
            return Err(SttError::NoSpeech);
        }

        on_progress(1.0);
        log::debug!(
            "stt: {} segment(s) from {}",
            segments.len(),
            audio.path.display()
        );
        Ok(segments)
    }
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double returning pre-configured segments without a model file.
///
/// Emits progress `0.5` then `1.0`, optionally sleeps to simulate inference
/// (waking early on cancellation), and counts calls, including the peak
/// number running at once.
#[cfg(test)]
pub struct MockRecognizer {
    response: Result<Vec<(f64, f64, String)>, SttError>,
    delay: std::time::Duration,
    calls: std::sync::atomic::AtomicUsize,
    running: std::sync::atomic::AtomicUsize,
    peak: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockRecognizer {
    /// Recognizer producing one segment per `(start, end, text)` entry.
    pub fn ok(segments: &[(f64, f64, &str)]) -> Self {
        Self {
            response: Ok(segments
                .iter()
                .map(|&(s, e, t)| (s, e, t.to_string()))
                .collect()),
            delay: std::time::Duration::ZERO,
            calls: Default::default(),
            running: Default::default(),
            peak: Default::default(),
        }
    }

    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
            delay: std::time::Duration::ZERO,
            calls: Default::default(),
            running: Default::default(),
            peak: Default::default(),
        }
    }

    /// Block for `delay` inside every call.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Calls currently executing.
    pub fn in_flight(&self) -> usize {
        self.running.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Largest number of calls that were in progress at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn simulate(&self, cancel: &CancellationToken) -> Result<(), SttError> {
        let deadline = std::time::Instant::now() + self.delay;
        while std::time::Instant::now() < deadline {
            if cancel.is_cancelled() {
                return Err(SttError::Cancelled);
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        if cancel.is_cancelled() {
            return Err(SttError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
impl Recognizer for MockRecognizer {
    fn recognize(
        &self,
        _audio: &AudioData,
        language: Language,
        on_progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranscriptSegment>, SttError> {
        use std::sync::atomic::Ordering::SeqCst;

        self.calls.fetch_add(1, SeqCst);
        let now = self.running.fetch_add(1, SeqCst) + 1;
        self.peak.fetch_max(now, SeqCst);

        on_progress(0.5);
        let simulated = self.simulate(cancel);
        self.running.fetch_sub(1, SeqCst);
        simulated?;

        let segments = self.response.clone()?;
        on_progress(1.0);
        Ok(segments
            .into_iter()
            .map(|(s, e, t)| TranscriptSegment::new(s, e, t, language))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
