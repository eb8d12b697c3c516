//! Identity → finished subtitle track.
//!
//! Entries are written once per identity and live for the rest of the
//! process.  There is no eviction: the queue cap bounds how many files can be
//! processed in practice, and re-adding a path reuses its entry.

use std::collections::HashMap;

use crate::model::TranslationSegment;

use super::caption::SubtitleTrack;

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<String, SubtitleTrack>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `segments` under `identity`.
    ///
    /// Returns `false` and leaves the existing entry untouched when the
    /// identity is already cached.
    pub fn put(&mut self, identity: impl Into<String>, segments: Vec<TranslationSegment>) -> bool {
        let identity = identity.into();
        if self.entries.contains_key(&identity) {
            log::debug!("cache: {identity} already cached, keeping first result");
            return false;
        }
        self.entries.insert(identity, SubtitleTrack::new(segments));
        true
    }

    /// The cached track for `identity`.  Cloning a track is an `Arc` clone.
    pub fn get(&self, identity: &str) -> Option<&SubtitleTrack> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
