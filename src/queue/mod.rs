//! File queue: the bounded work list and each item's lifecycle.
//!
//! * [`QueueStore`] — ordered, capacity-bounded list with a cursor.
//! * [`WorkItem`] — one queued file.
//! * [`ItemState`] — per-item state machine.

pub mod state;
pub mod store;

pub use state::{ItemState, TransitionError};
pub use store::{QueueStore, WorkItem};
