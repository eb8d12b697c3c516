//! Foreground orchestrator — owns the queue and the cache, drives one
//! background run at a time.
//!
//! [`Orchestrator`] is single-owner (`&mut self` everywhere): the UI event
//! loop calls its operations and pumps [`next_notification`] to receive
//! progress, completions and failures.  Background runs never touch the
//! queue or the cache; their events are applied here.
//!
//! # Flow
//!
//! ```text
//! select(i) / start_auto() / queue_changed()
//!   └─▶ process_one(identity)
//!         ├─ not queued           → Err(NotQueued)
//!         ├─ cached               → item Ready, Ready{cached} (no run)
//!         ├─ already running      → no-op
//!         └─ cancel_active().await (wait for the old run's terminal event)
//!            set_state(Processing) → spawn_run ──events──▶ apply()
//!                                                ├─ Completed → cache.put, Ready
//!                                                ├─ Failed    → Failed
//!                                                └─ Cancelled → Pending
//! auto mode: after every terminal event, process the first queued item
//!            with no cache entry that has not failed.
//! ```
//!
//! [`next_notification`]: Orchestrator::next_notification

use std::collections::VecDeque;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::cache::{ResultCache, SubtitleTrack};
use crate::config::LanguageConfig;
use crate::model::TranslationSegment;
use crate::queue::{ItemState, QueueStore};

use super::error::PipelineError;
use super::events::{Invocation, Notification, PipelineEvent};
use super::runner::{spawn_run, Collaborators, RunRequest};

/// The one in-flight run.
struct ActiveRun {
    invocation: Invocation,
    identity: String,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Outcome of applying a terminal event for the active run.
type Terminal = (Invocation, Result<SubtitleTrack, PipelineError>);

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Sequential pipeline orchestrator.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use subtitle_translator::audio::FileAudioLoader;
/// use subtitle_translator::config::AppConfig;
/// use subtitle_translator::pipeline::{Collaborators, Notification, Orchestrator};
/// use subtitle_translator::stt::{RecognizerParams, WhisperRecognizer};
/// use subtitle_translator::translate::OllamaTranslator;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::load_or_default();
/// let collab = Collaborators::new(
///     Arc::new(FileAudioLoader::new()),
///     Arc::new(WhisperRecognizer::load("ggml-medium.bin", RecognizerParams::default(), true)?),
///     Arc::new(OllamaTranslator::from_config(&config.translator)),
/// );
/// let mut orc = Orchestrator::new(collab, config.languages);
/// orc.add_files(["talk.wav", "song.mp3"]).await;
/// orc.start_auto().await;
/// while let Some(n) = orc.next_notification().await {
///     if let Notification::Progress { identity, fraction, .. } = n {
///         println!("{identity}: {:.0}%", fraction * 100.0);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    queue: QueueStore,
    cache: ResultCache,
    languages: LanguageConfig,
    collab: Collaborators,
    events_tx: UnboundedSender<PipelineEvent>,
    events_rx: UnboundedReceiver<PipelineEvent>,
    active: Option<ActiveRun>,
    next_invocation: Invocation,
    auto_mode: bool,
    pending: VecDeque<Notification>,
}

impl Orchestrator {
    pub fn new(collab: Collaborators, languages: LanguageConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            queue: QueueStore::new(),
            cache: ResultCache::new(),
            languages,
            collab,
            events_tx,
            events_rx,
            active: None,
            next_invocation: 1,
            auto_mode: false,
            pending: VecDeque::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn languages(&self) -> &LanguageConfig {
        &self.languages
    }

    /// Languages used by runs started from now on.
    pub fn set_languages(&mut self, languages: LanguageConfig) {
        self.languages = languages;
    }

    pub fn is_auto(&self) -> bool {
        self.auto_mode
    }

    /// Identity of the in-flight run, if any.
    pub fn processing(&self) -> Option<&str> {
        self.active.as_ref().map(|run| run.identity.as_str())
    }

    // -----------------------------------------------------------------------
    // Queue operations
    // -----------------------------------------------------------------------

    /// Admit files and fire the "queue changed" hook.  Returns the number
    /// admitted.
    pub async fn add_files<I, S>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths: Vec<S> = paths.into_iter().collect();
        let added = self.queue.add(paths.iter().map(|p| p.as_ref()));
        if added < paths.len() {
            log::warn!(
                "queue: {} of {} file(s) not admitted (unsupported format or queue full)",
                paths.len() - added,
                paths.len()
            );
        }
        self.queue_changed().await;
        added
    }

    /// Remove the item at `index`, cancelling its run if it is processing.
    pub async fn remove(&mut self, index: usize) -> bool {
        let Some(item) = self.queue.get(index) else {
            return false;
        };
        if item.state == ItemState::Processing {
            self.cancel_active().await;
        }
        let removed = self.queue.remove(index);
        self.queue_changed().await;
        removed
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        self.queue.move_item(from, to)
    }

    /// Cancel any run, empty the queue and leave auto mode.  Cached results
    /// are kept.
    pub async fn clear(&mut self) {
        self.auto_mode = false;
        self.cancel_active().await;
        self.queue.clear();
    }

    /// Hook for "the queue changed": in auto mode with nothing running, look
    /// for the next item to process.
    pub async fn queue_changed(&mut self) {
        if self.auto_mode && self.active.is_none() {
            self.advance().await;
        }
    }

    // -----------------------------------------------------------------------
    // Processing
    // -----------------------------------------------------------------------

    /// Process `identity` (its first slot when queued more than once).
    ///
    /// Returns `Ok(Some(track))` straight from the cache when the identity
    /// was processed before (no collaborator is called), `Ok(None)` when a
    /// run was started (or is already running for it) and the result will
    /// arrive as a notification.
    pub async fn process_one(
        &mut self,
        identity: &str,
    ) -> Result<Option<SubtitleTrack>, PipelineError> {
        let index = self
            .queue
            .position_of(identity)
            .ok_or_else(|| PipelineError::NotQueued(identity.to_string()))?;
        self.process_at(index).await
    }

    /// [`process_one`](Self::process_one) for the item in slot `index`.
    async fn process_at(&mut self, index: usize) -> Result<Option<SubtitleTrack>, PipelineError> {
        let owned = self
            .queue
            .get(index)
            .map(|item| item.identity.clone())
            .ok_or_else(|| PipelineError::NotQueued(format!("index {index}")))?;
        let identity = owned.as_str();

        if let Some(track) = self.cache.get(identity).cloned() {
            self.promote_cached(identity);
            log::debug!("pipeline: {identity} served from cache");
            self.pending.push_back(Notification::Ready {
                identity: identity.to_string(),
                track: track.clone(),
                cached: true,
            });
            return Ok(Some(track));
        }

        if self.processing() == Some(identity) {
            return Ok(None);
        }

        self.cancel_active().await;

        let invocation = self.next_invocation;
        self.next_invocation += 1;
        self.queue.set_state(index, ItemState::Processing);

        let token = CancellationToken::new();
        let request = RunRequest {
            invocation,
            identity: identity.to_string(),
            source: self.languages.source,
            target: self.languages.target,
        };
        log::info!(
            "pipeline: processing {identity} ({})",
            self.languages.direction_label()
        );
        let handle = spawn_run(
            self.collab.clone(),
            request,
            self.events_tx.clone(),
            token.clone(),
        );

        self.active = Some(ActiveRun {
            invocation,
            identity: identity.to_string(),
            token,
            handle,
        });
        self.pending.push_back(Notification::Started {
            identity: identity.to_string(),
        });
        Ok(None)
    }

    /// [`process_one`](Self::process_one) and wait for its outcome.
    ///
    /// Notifications produced meanwhile stay queued for
    /// [`next_notification`](Self::next_notification).  Does not auto-advance.
    pub async fn process_and_wait(&mut self, identity: &str) -> Result<SubtitleTrack, PipelineError> {
        if let Some(track) = self.process_one(identity).await? {
            return Ok(track);
        }
        let Some(invocation) = self.active.as_ref().map(|run| run.invocation) else {
            return Err(PipelineError::Cancelled);
        };

        while self.active.is_some() {
            if let Some((done, outcome)) = self.pump().await {
                if done == invocation {
                    return outcome;
                }
            }
        }
        Err(PipelineError::Cancelled)
    }

    /// Enter auto mode and start on the first unprocessed item.
    pub async fn start_auto(&mut self) {
        log::info!("pipeline: auto mode on");
        self.auto_mode = true;
        if self.active.is_none() {
            self.advance().await;
        }
    }

    /// Leave auto mode; an in-flight run is allowed to finish.
    pub fn stop_auto(&mut self) {
        self.auto_mode = false;
    }

    /// Cancel the in-flight run, if any, and wait for it to stop.  The item
    /// goes back to `Pending`.
    pub async fn cancel(&mut self) {
        self.cancel_active().await;
    }

    /// Next notification for the UI.
    ///
    /// Waits for the in-flight run when nothing is queued; returns `None`
    /// when there is nothing queued and nothing running.
    pub async fn next_notification(&mut self) -> Option<Notification> {
        loop {
            if let Some(n) = self.pending.pop_front() {
                return Some(n);
            }
            self.active.as_ref()?;
            if self.pump().await.is_some() && self.auto_mode {
                self.advance().await;
            }
        }
    }

    /// Wait for the next event of the active run and apply it.  Returns the
    /// outcome once the run has ended.
    ///
    /// Also watches the run's task, so a task that dies without a terminal
    /// event (a panicking collaborator) still ends the run.
    async fn pump(&mut self) -> Option<Terminal> {
        let run = self.active.as_mut()?;
        let received = tokio::select! {
            biased;
            event = self.events_rx.recv() => Ok(event),
            joined = &mut run.handle => Err(joined.err()),
        };
        match received {
            Ok(Some(event)) => self.apply(event),
            Ok(None) => self.reap(None),
            Err(join_error) => self.reap(join_error),
        }
    }

    /// The active run's task has exited: apply whatever it left in the
    /// channel and fail the item if no terminal event was among it.
    fn reap(&mut self, join_error: Option<JoinError>) -> Option<Terminal> {
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(terminal) = self.apply(event) {
                return Some(terminal);
            }
        }

        let run = self.active.take()?;
        let reason = match join_error {
            Some(e) => format!("run task for {} failed: {e}", run.identity),
            None => format!("run task for {} exited without a result", run.identity),
        };
        log::error!("pipeline: {reason}");
        let error = PipelineError::Aborted(reason);
        self.settle(&run.identity, ItemState::Failed);
        self.pending.push_back(Notification::Failed {
            identity: run.identity,
            error: error.clone(),
        });
        Some((run.invocation, Err(error)))
    }

    /// Process the first item with no cache entry that has not failed, or
    /// leave auto mode when there is none.
    async fn advance(&mut self) {
        let candidate = self.queue.items().iter().position(|item| {
            item.state != ItemState::Failed && !self.cache.contains(&item.identity)
        });

        match candidate {
            Some(index) => {
                if let Err(e) = self.process_at(index).await {
                    log::warn!("pipeline: auto mode could not start slot {index}: {e}");
                }
            }
            None => {
                log::info!("pipeline: auto mode finished, nothing left to process");
                self.auto_mode = false;
                self.pending.push_back(Notification::AutoFinished);
            }
        }
    }

    /// Cancel the active run and wait until its terminal event is in the
    /// channel, then apply everything it emitted.
    async fn cancel_active(&mut self) {
        let Some(run) = self.active.as_mut() else {
            return;
        };
        log::debug!("pipeline: cancelling run for {}", run.identity);
        run.token.cancel();
        if let Err(e) = (&mut run.handle).await {
            log::error!("pipeline: run task for {} panicked: {e}", run.identity);
        }

        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
        }

        // Only reachable if the run task died without a terminal event.
        if let Some(run) = self.active.take() {
            self.settle(&run.identity, ItemState::Pending);
            self.pending.push_back(Notification::Cancelled {
                identity: run.identity,
            });
        }
    }

    /// Apply one background event.  Returns the outcome when it was the
    /// terminal event of the active run; stale events are dropped.
    fn apply(&mut self, event: PipelineEvent) -> Option<Terminal> {
        let active = self.active.as_ref()?;
        if event.invocation() != active.invocation {
            log::debug!(
                "pipeline: dropping stale event of invocation {}",
                event.invocation()
            );
            return None;
        }
        let identity = active.identity.clone();

        match event {
            PipelineEvent::Progress {
                fraction, stage, ..
            } => {
                self.pending.push_back(Notification::Progress {
                    identity,
                    fraction,
                    stage,
                });
                None
            }
            PipelineEvent::Completed {
                invocation,
                segments,
                ..
            } => {
                self.active = None;
                let track = self.store(&identity, segments);
                self.settle(&identity, ItemState::Ready);
                self.promote_cached(&identity);
                self.pending.push_back(Notification::Ready {
                    identity,
                    track: track.clone(),
                    cached: false,
                });
                Some((invocation, Ok(track)))
            }
            PipelineEvent::Failed {
                invocation, error, ..
            } => {
                self.active = None;
                self.settle(&identity, ItemState::Failed);
                self.pending.push_back(Notification::Failed {
                    identity,
                    error: error.clone(),
                });
                Some((invocation, Err(error)))
            }
            PipelineEvent::Cancelled { invocation, .. } => {
                self.active = None;
                self.settle(&identity, ItemState::Pending);
                self.pending
                    .push_back(Notification::Cancelled { identity });
                Some((invocation, Err(PipelineError::Cancelled)))
            }
        }
    }

    fn store(&mut self, identity: &str, segments: Vec<TranslationSegment>) -> SubtitleTrack {
        self.cache.put(identity, segments);
        self.cache
            .get(identity)
            .cloned()
            .unwrap_or_else(|| SubtitleTrack::new(Vec::new()))
    }

    /// Every `Pending` slot holding `identity` has captions now.
    fn promote_cached(&mut self, identity: &str) {
        let slots: Vec<usize> = self
            .queue
            .items()
            .iter()
            .enumerate()
            .filter(|(_, item)| item.identity == identity && item.state == ItemState::Pending)
            .map(|(i, _)| i)
            .collect();
        for index in slots {
            self.queue.set_state(index, ItemState::Ready);
        }
    }

    /// Move the `Processing` item for `identity` (if it is still queued) to
    /// `state`.
    fn settle(&mut self, identity: &str, state: ItemState) {
        let index = self
            .queue
            .items()
            .iter()
            .position(|item| item.identity == identity && item.state == ItemState::Processing);
        if let Some(index) = index {
            self.queue.set_state(index, state);
        }
    }

    // -----------------------------------------------------------------------
    // Playback coordination
    // -----------------------------------------------------------------------

    /// The "file selected" event: move the cursor to `index` and make its
    /// captions available, processing it first when needed.
    ///
    /// A `Failed` item is retried.
    pub async fn select(&mut self, index: usize) -> Result<Option<SubtitleTrack>, PipelineError> {
        if self.queue.get(index).is_none() {
            return Err(PipelineError::NotQueued(format!("index {index}")));
        }
        self.stop_other_playback(index);
        self.queue.set_current(index);
        self.process_at(index).await
    }

    /// The player started the current item.  Returns `false` when it has no
    /// captions yet.
    pub fn playback_started(&mut self) -> bool {
        let Some(index) = self.queue.current_index() else {
            return false;
        };
        match self.queue.get(index).map(|item| item.state) {
            Some(ItemState::Ready) => {
                let _ = self.queue.transition(index, ItemState::Playing);
                true
            }
            Some(state) => state.is_playable(),
            None => false,
        }
    }

    /// The user stopped playback or switched away.
    pub fn playback_stopped(&mut self) {
        if let Some(index) = self.queue.current_index() {
            if self.queue.get(index).map(|item| item.state) == Some(ItemState::Playing) {
                let _ = self.queue.transition(index, ItemState::Ready);
            }
        }
    }

    /// The current item played to the end: mark it `Completed` and select the
    /// next one.  At the end of the queue a `QueueFinished` notification is
    /// queued and `Ok(None)` returned.
    pub async fn playback_finished(&mut self) -> Result<Option<SubtitleTrack>, PipelineError> {
        if let Some(index) = self.queue.current_index() {
            if self.queue.get(index).map(|item| item.state) == Some(ItemState::Playing) {
                let _ = self.queue.transition(index, ItemState::Completed);
            }
        }

        match self.queue.next_after_current().and(self.queue.current_index()) {
            Some(index) => self.process_at(index).await,
            None => {
                log::info!("queue: reached the end of the queue");
                self.pending.push_back(Notification::QueueFinished);
                Ok(None)
            }
        }
    }

    /// Caption active at playback time `t` for the current item.
    pub fn caption_at(&self, t: f64) -> Option<&TranslationSegment> {
        self.current_track()?.active(t)
    }

    /// Cached track of the item under the cursor.
    pub fn current_track(&self) -> Option<&SubtitleTrack> {
        self.cache.get(self.queue.current_identity()?)
    }

    fn stop_other_playback(&mut self, selected: usize) {
        let playing = self
            .queue
            .items()
            .iter()
            .position(|item| item.state == ItemState::Playing);
        if let Some(index) = playing.filter(|&i| i != selected) {
            self.queue.set_state(index, ItemState::Ready);
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Some(run) = &self.active {
            run.token.cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
