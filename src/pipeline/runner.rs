//! Background pipeline run — load → recognize → translate for one file.
//!
//! # Run flow
//!
//! ```text
//! spawn_run ──▶ tokio task ── execute():
//!   spawn_blocking(loader.load)                  [Loading      0.00-0.10]
//!   spawn_blocking(recognizer.recognize(token))  [Recognizing  0.10-0.70]
//!   select! { token.cancelled() | translate_batch }  [Translating  0.70-0.95]
//!     └─ skipped when source == target
//!   ─────────────────────────────────────────────[Finalizing   0.95-1.00]
//!     ├─ Ok        ──▶ Progress(1.0), Completed
//!     ├─ cancelled ──▶ Cancelled
//!     └─ Err       ──▶ Failed
//! ```
//!
//! Blocking collaborators run on `tokio::task::spawn_blocking` so the
//! runtime never stalls.  Their join handles are always awaited: the token
//! is checked between stages and handed to the recognizer, so a cancelled
//! run stops its inference instead of leaving it running detached.  The run
//! never touches the queue or the cache: all output goes through the event
//! channel, and the [`ProgressReporter`] guarantees the ordering described
//! in [`super::events`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioLoader;
use crate::model::{Language, TranslationSegment};
use crate::stt::{ProgressFn, Recognizer};
use crate::translate::{echo_segments, Translator};

use super::error::PipelineError;
use super::events::{Invocation, PipelineEvent};
use super::state::Stage;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The external services a run depends on.
///
/// Created once at startup and shared by every run; cloning is three `Arc`
/// clones.
#[derive(Clone)]
pub struct Collaborators {
    pub loader: Arc<dyn AudioLoader>,
    pub recognizer: Arc<dyn Recognizer>,
    pub translator: Arc<dyn Translator>,
}

impl Collaborators {
    pub fn new(
        loader: Arc<dyn AudioLoader>,
        recognizer: Arc<dyn Recognizer>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            loader,
            recognizer,
            translator,
        }
    }
}

/// Inputs of a single run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub invocation: Invocation,
    pub identity: String,
    pub source: Language,
    pub target: Language,
}

// ---------------------------------------------------------------------------
// ProgressReporter
// ---------------------------------------------------------------------------

struct ReporterState {
    last: f32,
    closed: bool,
}

/// Monotonic progress sink for one invocation.
///
/// Fractions below the last reported value are raised to it.  Once the
/// terminal event has been sent through [`finish`](Self::finish) every
/// further report is dropped, which covers recognizer callbacks still firing
/// on a blocking thread after the run was cancelled.
pub struct ProgressReporter {
    invocation: Invocation,
    tx: UnboundedSender<PipelineEvent>,
    state: Mutex<ReporterState>,
}

impl ProgressReporter {
    pub fn new(invocation: Invocation, tx: UnboundedSender<PipelineEvent>) -> Self {
        Self {
            invocation,
            tx,
            state: Mutex::new(ReporterState {
                last: 0.0,
                closed: false,
            }),
        }
    }

    /// Report a pipeline-wide fraction.
    pub fn report(&self, fraction: f32, stage: Stage) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.closed {
            return;
        }
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        state.last = state.last.max(fraction);
        let _ = self.tx.send(PipelineEvent::Progress {
            invocation: self.invocation,
            fraction: state.last,
            stage,
        });
    }

    /// Report a fraction local to `stage`, mapped into its band.
    pub fn report_within(&self, stage: Stage, local: f32) {
        self.report(stage.scale(local), stage);
    }

    /// Send the terminal event and close the reporter.
    pub fn finish(&self, event: PipelineEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.closed {
            return;
        }
        state.closed = true;
        let _ = self.tx.send(event);
    }

    /// Last fraction reported.
    pub fn last(&self) -> f32 {
        self.state.lock().map(|s| s.last).unwrap_or(0.0)
    }

    /// A recognizer progress callback writing into `stage`'s band.
    pub fn stage_sink(self: &Arc<Self>, stage: Stage) -> ProgressFn {
        let reporter = Arc::clone(self);
        Arc::new(move |local| reporter.report_within(stage, local))
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Start a run on the tokio runtime.
///
/// The returned handle finishes right after the terminal event has been
/// sent, and never before the blocking work it started has returned.
/// Awaiting it after `token.cancel()` therefore guarantees that the channel
/// holds every event this invocation will ever produce and that no
/// recognizer call of this run is still executing.
pub fn spawn_run(
    collab: Collaborators,
    request: RunRequest,
    tx: UnboundedSender<PipelineEvent>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reporter = Arc::new(ProgressReporter::new(request.invocation, tx));

        let outcome = execute(&collab, &request, &reporter, &token).await;

        let RunRequest {
            invocation,
            identity,
            ..
        } = request;

        let event = match outcome {
            Ok(segments) => {
                reporter.report(1.0, Stage::Finalizing);
                log::info!("pipeline: {identity} done ({} segments)", segments.len());
                PipelineEvent::Completed {
                    invocation,
                    identity,
                    segments,
                }
            }
            Err(PipelineError::Cancelled) => {
                log::info!("pipeline: {identity} cancelled");
                PipelineEvent::Cancelled {
                    invocation,
                    identity,
                }
            }
            Err(error) => {
                log::error!("pipeline: {identity} failed: {error}");
                PipelineEvent::Failed {
                    invocation,
                    identity,
                    error,
                }
            }
        };
        reporter.finish(event);
    })
}

async fn execute(
    collab: &Collaborators,
    request: &RunRequest,
    reporter: &Arc<ProgressReporter>,
    token: &CancellationToken,
) -> Result<Vec<TranslationSegment>, PipelineError> {
    let RunRequest {
        identity,
        source,
        target,
        ..
    } = request;
    let (source, target) = (*source, *target);
    let check = || {
        if token.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    };

    // ── 1. Load (blocking → thread pool) ────────────────────────────────
    check()?;
    reporter.report_within(Stage::Loading, 0.0);
    let loader = Arc::clone(&collab.loader);
    let path = PathBuf::from(identity);
    let audio = tokio::task::spawn_blocking(move || loader.load(&path))
        .await
        .map_err(|e| PipelineError::LoadFailed(format!("loader task failed: {e}")))??;
    log::debug!("pipeline: loaded {identity} ({:.1}s)", audio.duration_secs);
    check()?;
    reporter.report_within(Stage::Loading, 1.0);

    // ── 2. Recognize (blocking → thread pool) ───────────────────────────
    let recognizer = Arc::clone(&collab.recognizer);
    let sink = reporter.stage_sink(Stage::Recognizing);
    let cancel = token.clone();
    let transcript =
        tokio::task::spawn_blocking(move || recognizer.recognize(&audio, source, sink, &cancel))
            .await
            .map_err(|e| PipelineError::RecognitionFailed(format!("recognizer task failed: {e}")))??;
    check()?;

    if transcript.is_empty() {
        return Err(PipelineError::RecognitionFailed("no speech detected".into()));
    }
    log::debug!("pipeline: {} segment(s) recognized in {identity}", transcript.len());
    reporter.report_within(Stage::Recognizing, 1.0);

    // ── 3. Translate (async) ────────────────────────────────────────────
    let translated = if source == target {
        log::debug!("pipeline: {source} → {target}, skipping translation");
        echo_segments(&transcript, source, target)
    } else {
        let sink = reporter.stage_sink(Stage::Translating);
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            result = collab.translator.translate_batch(&transcript, source, target, sink) => result?,
        }
    };
    reporter.report_within(Stage::Translating, 1.0);

    if translated.len() != transcript.len() {
        return Err(PipelineError::TranslationFailed(format!(
            "expected {} segments, translator returned {}",
            transcript.len(),
            translated.len()
        )));
    }

    Ok(translated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioError, MockLoader};
    use crate::stt::{MockRecognizer, SttError};
    use crate::translate::RecordingTranslator;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn collab(
        loader: MockLoader,
        recognizer: MockRecognizer,
        translator: Arc<RecordingTranslator>,
    ) -> Collaborators {
        Collaborators::new(Arc::new(loader), Arc::new(recognizer), translator)
    }

    fn request(source: Language, target: Language) -> RunRequest {
        RunRequest {
            invocation: 1,
            identity: "/media/a.wav".into(),
            source,
            target,
        }
    }

    async fn run_to_end(
        collab: Collaborators,
        req: RunRequest,
        token: CancellationToken,
    ) -> Vec<PipelineEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_run(collab, req, tx, token).await.unwrap();
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn fractions(events: &[PipelineEvent]) -> Vec<f32> {
        events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Progress { fraction, .. } => Some(*fraction),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn successful_run_ends_with_full_progress_then_completed() {
        let tr = Arc::new(RecordingTranslator::new());
        let events = run_to_end(
            collab(MockLoader::ok(), MockRecognizer::ok(&[(0.0, 1.0, "hi")]), tr.clone()),
            request(Language::En, Language::Zh),
            CancellationToken::new(),
        )
        .await;

        let fr = fractions(&events);
        assert!(fr.windows(2).all(|w| w[0] <= w[1]), "{fr:?}");
        assert_eq!(fr.last().copied(), Some(1.0));
        // Recognizer's and translator's 0.5 land mid-band.
        assert!(fr.iter().any(|f| (f - 0.40).abs() < 1e-6), "{fr:?}");
        assert!(fr.iter().any(|f| (f - 0.825).abs() < 1e-6), "{fr:?}");

        match events.last() {
            Some(PipelineEvent::Completed { segments, .. }) => {
                assert_eq!(segments[0].translated, "zh:hi");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(tr.call_count(), 1);
    }

    #[tokio::test]
    async fn same_language_skips_translator() {
        let tr = Arc::new(RecordingTranslator::new());
        let events = run_to_end(
            collab(MockLoader::ok(), MockRecognizer::ok(&[(0.0, 1.0, "你好")]), tr.clone()),
            request(Language::Zh, Language::Zh),
            CancellationToken::new(),
        )
        .await;

        let Some(PipelineEvent::Completed { segments, .. }) = events.last() else {
            panic!("expected Completed");
        };
        assert!(segments.iter().all(|s| s.translated == s.original));
        assert_eq!(tr.call_count(), 0);
    }

    #[tokio::test]
    async fn load_failure_maps_to_not_found() {
        let events = run_to_end(
            collab(
                MockLoader::err(AudioError::NotFound("/media/a.wav".into())),
                MockRecognizer::ok(&[(0.0, 1.0, "x")]),
                Arc::new(RecordingTranslator::new()),
            ),
            request(Language::Ja, Language::Zh),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            events.last(),
            Some(PipelineEvent::Failed {
                error: PipelineError::NotFound(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn empty_transcript_is_recognition_failure() {
        let events = run_to_end(
            collab(
                MockLoader::ok(),
                MockRecognizer::ok(&[]),
                Arc::new(RecordingTranslator::new()),
            ),
            request(Language::Ja, Language::Zh),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            events.last(),
            Some(PipelineEvent::Failed {
                error: PipelineError::RecognitionFailed(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn translator_outage_is_backend_unreachable() {
        let events = run_to_end(
            collab(
                MockLoader::ok(),
                MockRecognizer::ok(&[(0.0, 1.0, "x")]),
                Arc::new(RecordingTranslator::failing()),
            ),
            request(Language::Ja, Language::Zh),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            events.last(),
            Some(PipelineEvent::Failed {
                error: PipelineError::BackendUnreachable(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn recognizer_error_is_recognition_failure() {
        let events = run_to_end(
            collab(
                MockLoader::ok(),
                MockRecognizer::err(SttError::ModelNotFound("m.bin".into())),
                Arc::new(RecordingTranslator::new()),
            ),
            request(Language::Ko, Language::Zh),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            events.last(),
            Some(PipelineEvent::Failed {
                error: PipelineError::RecognitionFailed(msg),
                ..
            }) if msg.contains("m.bin")
        ));
    }

    #[tokio::test]
    async fn cancelled_run_emits_nothing_after_terminal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let recognizer =
            Arc::new(MockRecognizer::ok(&[(0.0, 1.0, "x")]).with_delay(Duration::from_secs(5)));
        let handle = spawn_run(
            Collaborators::new(
                Arc::new(MockLoader::ok()),
                recognizer.clone(),
                Arc::new(RecordingTranslator::new()),
            ),
            request(Language::Ja, Language::Zh),
            tx,
            token.clone(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("run should stop soon after cancellation")
            .unwrap();

        // The recognizer call returned before the run task finished.
        assert_eq!(recognizer.in_flight(), 0);
        assert_eq!(recognizer.call_count(), 1);

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert!(matches!(events.last(), Some(PipelineEvent::Cancelled { .. })));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_calls_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let loader = Arc::new(MockLoader::ok());
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_run(
            Collaborators::new(
                loader.clone(),
                Arc::new(MockRecognizer::ok(&[(0.0, 1.0, "x")])),
                Arc::new(RecordingTranslator::new()),
            ),
            request(Language::Ja, Language::Zh),
            tx,
            token,
        )
        .await
        .unwrap();

        assert_eq!(loader.call_count(), 0);
        assert!(matches!(rx.try_recv(), Ok(PipelineEvent::Cancelled { .. })));
    }

    #[test]
    fn reporter_is_monotonic_and_closes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let r = ProgressReporter::new(7, tx);
        r.report(0.3, Stage::Recognizing);
        r.report(0.2, Stage::Recognizing);
        r.report(f32::NAN, Stage::Recognizing);
        r.finish(PipelineEvent::Cancelled {
            invocation: 7,
            identity: "a".into(),
        });
        r.report(0.9, Stage::Translating);

        let mut seen = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            seen.push(ev);
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(fractions(&seen), vec![0.3, 0.3, 0.3]);
        assert!(seen[3].is_terminal());
        assert!((r.last() - 0.3).abs() < f32::EPSILON);
    }
}
