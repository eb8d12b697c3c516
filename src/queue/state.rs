//! Per-item lifecycle state machine.
//!
//! [`ItemState`] is the state of one [`WorkItem`](super::WorkItem) in the
//! queue.  Transitions:
//!
//! ```text
//! Pending ──orchestrator picks──▶ Processing
//! Pending ──result already cached──▶ Ready
//! Processing ──success──▶ Ready
//! Processing ──failure──▶ Failed
//! Processing ──demoted / cancelled──▶ Pending
//! Failed ──user reselects──▶ Processing
//! Ready ──playback starts──▶ Playing
//! Playing ──user stops / switches──▶ Ready
//! Playing ──end of media──▶ Completed   (terminal)
//! ```
//!
//! The single-slot rule (at most one `Processing` item in the queue) is not
//! a property of one item and lives in
//! [`QueueStore::set_state`](super::QueueStore::set_state).

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ItemState
// ---------------------------------------------------------------------------

/// Lifecycle state of a queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemState {
    /// Waiting to be processed.
    Pending,
    /// The pipeline is running on this item.
    Processing,
    /// Processed; captions are cached and the item can be played.
    Ready,
    /// Currently playing.
    Playing,
    /// Played through to the end.
    Completed,
    /// The last processing attempt failed.  Retried only on reselection.
    Failed,
}

impl ItemState {
    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Staying in the same state is always allowed.
    ///
    /// ```
    /// use subtitle_translator::queue::ItemState;
    ///
    /// assert!(ItemState::Pending.can_transition_to(ItemState::Processing));
    /// assert!(ItemState::Processing.can_transition_to(ItemState::Ready));
    /// assert!(!ItemState::Completed.can_transition_to(ItemState::Pending));
    /// ```
    pub fn can_transition_to(self, next: ItemState) -> bool {
        use ItemState::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Ready)
                | (Processing, Ready)
                | (Processing, Failed)
                | (Processing, Pending)
                | (Failed, Processing)
                | (Ready, Playing)
                | (Playing, Ready)
                | (Playing, Completed)
        )
    }

    /// `true` once no further transition is possible.
    pub fn is_terminal(self) -> bool {
        self == ItemState::Completed
    }

    /// `true` when captions for this item are available for playback.
    pub fn is_playable(self) -> bool {
        matches!(
            self,
            ItemState::Ready | ItemState::Playing | ItemState::Completed
        )
    }

    /// A short human-readable label for status displays.
    pub fn label(self) -> &'static str {
        match self {
            ItemState::Pending => "Pending",
            ItemState::Processing => "Processing",
            ItemState::Ready => "Ready",
            ItemState::Playing => "Playing",
            ItemState::Completed => "Completed",
            ItemState::Failed => "Failed",
        }
    }
}

impl Default for ItemState {
    fn default() -> Self {
        ItemState::Pending
    }
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Rejected state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("no queue item at index {0}")]
    OutOfRange(usize),

    #[error("illegal transition {from:?} -> {to:?}")]
    Illegal { from: ItemState, to: ItemState },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
