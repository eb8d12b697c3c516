//! Messages crossing the background → foreground boundary, and the
//! notifications the orchestrator hands to its caller.
//!
//! # Ordering contract
//!
//! For one invocation the background run emits zero or more
//! [`PipelineEvent::Progress`] with non-decreasing fractions, then exactly one
//! terminal event (`Completed`, `Failed` or `Cancelled`).  On success the last
//! progress fraction is `1.0`.  Nothing is emitted after the terminal event.

use crate::cache::SubtitleTrack;
use crate::model::TranslationSegment;

use super::error::PipelineError;
use super::state::Stage;

/// Identifies one `process_one` run.  Strictly increasing per orchestrator.
pub type Invocation = u64;

/// Event sent by a background run over the orchestrator's channel.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Progress {
        invocation: Invocation,
        fraction: f32,
        stage: Stage,
    },
    Completed {
        invocation: Invocation,
        identity: String,
        segments: Vec<TranslationSegment>,
    },
    Failed {
        invocation: Invocation,
        identity: String,
        error: PipelineError,
    },
    Cancelled {
        invocation: Invocation,
        identity: String,
    },
}

impl PipelineEvent {
    pub fn invocation(&self) -> Invocation {
        match self {
            PipelineEvent::Progress { invocation, .. }
            | PipelineEvent::Completed { invocation, .. }
            | PipelineEvent::Failed { invocation, .. }
            | PipelineEvent::Cancelled { invocation, .. } => *invocation,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineEvent::Progress { .. })
    }
}

/// What the orchestrator reports to the UI layer.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Processing of `identity` began.
    Started { identity: String },
    Progress {
        identity: String,
        fraction: f32,
        stage: Stage,
    },
    /// Captions for `identity` are available; `cached` when no run was needed.
    Ready {
        identity: String,
        track: SubtitleTrack,
        cached: bool,
    },
    Failed {
        identity: String,
        error: PipelineError,
    },
    Cancelled { identity: String },
    /// Auto mode found no further unprocessed item.
    AutoFinished,
    /// Playback reached the end of the last item in the queue.
    QueueFinished,
}

impl Notification {
    /// The item this notification is about, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Notification::Started { identity }
            | Notification::Progress { identity, .. }
            | Notification::Ready { identity, .. }
            | Notification::Failed { identity, .. }
            | Notification::Cancelled { identity } => Some(identity),
            Notification::AutoFinished | Notification::QueueFinished => None,
        }
    }
}
