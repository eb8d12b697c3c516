//! Caption index: maps a playback time to the active segment.
//!
//! Called on every playback-clock tick, so the lookup is a binary search over
//! the segment slice and never allocates.  For sorted, non-overlapping
//! segments it returns exactly what a front-to-back scan for the first
//! `start <= t < end` match would.

use std::sync::Arc;

use crate::model::TranslationSegment;

/// Index `i` with `segments[i].start <= t < segments[i].end`, or `None` when
/// `t` is before the first segment, in a gap, or at/after the last end.
///
/// Precondition (not checked): `segments` is ordered by start time and
/// non-overlapping.
///
/// ```
/// use subtitle_translator::cache::active_index;
/// use subtitle_translator::model::{Language, TranscriptSegment};
///
/// let segs: Vec<_> = [(0.0, 2.0, "a"), (2.0, 4.0, "b"), (5.0, 7.0, "c")]
///     .iter()
///     .map(|&(s, e, t)| TranscriptSegment::new(s, e, t, Language::Zh).translated(t, Language::Zh))
///     .collect();
///
/// assert_eq!(active_index(&segs, 1.0), Some(0));
/// assert_eq!(active_index(&segs, 2.0), Some(1));
/// assert_eq!(active_index(&segs, 4.5), None);
/// assert_eq!(active_index(&segs, 7.0), None);
/// ```
pub fn active_index(segments: &[TranslationSegment], t: f64) -> Option<usize> {
    if t.is_nan() {
        return None;
    }
    // Number of segments starting at or before t; the candidate is the last.
    let after = segments.partition_point(|seg| seg.start <= t);
    let i = after.checked_sub(1)?;
    segments[i].contains(t).then_some(i)
}

// ---------------------------------------------------------------------------
// SubtitleTrack
// ---------------------------------------------------------------------------

/// Immutable, cheaply clonable segment list for one processed file.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTrack {
    segments: Arc<[TranslationSegment]>,
}

impl SubtitleTrack {
    pub fn new(segments: Vec<TranslationSegment>) -> Self {
        Self {
            segments: segments.into(),
        }
    }

    pub fn segments(&self) -> &[TranslationSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Active segment index at playback time `t`.
    pub fn active_index(&self, t: f64) -> Option<usize> {
        active_index(&self.segments, t)
    }

    /// Active segment at playback time `t`.
    pub fn active(&self, t: f64) -> Option<&TranslationSegment> {
        self.active_index(t).map(|i| &self.segments[i])
    }

    pub fn segment(&self, index: usize) -> Option<&TranslationSegment> {
        self.segments.get(index)
    }

    /// Serialise the segment list as pretty JSON (`{"segments": [...]}`).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&serde_json::json!({ "segments": &*self.segments }))
    }

    /// Parse JSON produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        #[derive(serde::Deserialize)]
        struct Wire {
            segments: Vec<TranslationSegment>,
        }
        let wire: Wire = serde_json::from_str(json)?;
        Ok(Self::new(wire.segments))
    }
}

impl From<Vec<TranslationSegment>> for SubtitleTrack {
    fn from(segments: Vec<TranslationSegment>) -> Self {
        Self::new(segments)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
