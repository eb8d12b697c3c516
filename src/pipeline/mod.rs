//! Processing pipeline: one media file in, a translated subtitle track out.
//!
//! # Architecture
//!
//! ```text
//! UI event loop
//!     │  select / start_auto / add_files / playback_*
//!     ▼
//! Orchestrator  (owns QueueStore + ResultCache, &mut self)
//!     │  spawn_run(invocation, identity, languages, CancellationToken)
//!     ▼
//! tokio task ──────────────────────────────────────────────────────┐
//!     ├─ spawn_blocking(AudioLoader::load)         Loading     0–10% │
//!     ├─ spawn_blocking(Recognizer::recognize)     Recognizing 10–70%│
//!     ├─ Translator::translate_batch (or echo)     Translating 70–95%│
//!     └─ assemble TranslationSegments              Finalizing  95–100%
//!                                                                  │
//!     PipelineEvent (mpsc, tagged with invocation) ◀───────────────┘
//!     ▼
//! Orchestrator::next_notification → Notification for the UI
//! ```
//!
//! At most one run is in flight.  Starting a new run cancels the previous one
//! and waits for its terminal event before the new run's first event, so the
//! UI never sees two runs interleave.

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use error::PipelineError;
pub use events::{Invocation, Notification, PipelineEvent};
pub use orchestrator::Orchestrator;
pub use runner::{spawn_run, Collaborators, ProgressReporter, RunRequest};
pub use state::Stage;
