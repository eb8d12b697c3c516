//! Transcript and translation segment types.
//!
//! Times are seconds from the start of the media file.  Segment lists are
//! expected to be ordered by start time and non-overlapping, but nothing here
//! enforces it — the recognizer produces them that way.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::Language;

// ---------------------------------------------------------------------------
// TranscriptSegment
// ---------------------------------------------------------------------------

/// A single time-aligned chunk of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Recognized text (trimmed).
    pub text: String,
    /// Language the text was recognized in.
    pub language: Language,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>, language: Language) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            language,
        }
    }

    /// Pair this segment with its translation.
    pub fn translated(&self, translated: impl Into<String>, target: Language) -> TranslationSegment {
        TranslationSegment {
            start: self.start,
            end: self.end,
            original: self.text.clone(),
            translated: translated.into(),
            source_language: self.language,
            target_language: target,
        }
    }
}

// ---------------------------------------------------------------------------
// TranslationSegment
// ---------------------------------------------------------------------------

/// A transcript segment together with its translation.
///
/// When `source_language == target_language`, `translated == original`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationSegment {
    pub start: f64,
    pub end: f64,
    pub original: String,
    pub translated: String,
    pub source_language: Language,
    pub target_language: Language,
}

impl TranslationSegment {
    /// Start time as `HH:MM:SS`.
    pub fn format_start_time(&self) -> String {
        format_timestamp(self.start)
    }

    /// End time as `HH:MM:SS`.
    pub fn format_end_time(&self) -> String {
        format_timestamp(self.end)
    }

    /// Whether `t` falls inside `[start, end)`.
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Format seconds as `HH:MM:SS`, truncating fractional seconds.
///
/// ```
/// use subtitle_translator::model::format_timestamp;
///
/// assert_eq!(format_timestamp(0.0), "00:00:00");
/// assert_eq!(format_timestamp(3725.9), "01:02:05");
/// ```
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

// ---------------------------------------------------------------------------
// TranslationResult
// ---------------------------------------------------------------------------

/// A finished file: its segments plus the language pair and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Path of the audio file the segments belong to.
    pub audio_file: String,
    pub source_language: Language,
    pub target_language: Language,
    pub segments: Vec<TranslationSegment>,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: u64,
}

impl TranslationResult {
    pub fn new(
        audio_file: impl Into<String>,
        source_language: Language,
        target_language: Language,
        segments: Vec<TranslationSegment>,
    ) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            audio_file: audio_file.into(),
            source_language,
            target_language,
            segments,
            created_at,
        }
    }

    /// Serialise as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TranslationSegment {
        TranscriptSegment::new(61.5, 125.0, "こんにちは", Language::Ja)
            .translated("你好", Language::Zh)
    }

    #[test]
    fn translated_keeps_timing_and_languages() {
        let seg = sample();
        assert_eq!(seg.start, 61.5);
        assert_eq!(seg.end, 125.0);
        assert_eq!(seg.original, "こんにちは");
        assert_eq!(seg.translated, "你好");
        assert_eq!(seg.source_language, Language::Ja);
        assert_eq!(seg.target_language, Language::Zh);
    }

    #[test]
    fn formats_times_as_hh_mm_ss() {
        let seg = sample();
        assert_eq!(seg.format_start_time(), "00:01:01");
        assert_eq!(seg.format_end_time(), "00:02:05");
    }

    #[test]
    fn negative_and_nan_times_format_as_zero() {
        assert_eq!(format_timestamp(-3.0), "00:00:00");
        assert_eq!(format_timestamp(f64::NAN), "00:00:00");
    }

    #[test]
    fn contains_is_half_open() {
        let seg = sample();
        assert!(seg.contains(61.5));
        assert!(seg.contains(124.99));
        assert!(!seg.contains(125.0));
        assert!(!seg.contains(61.4));
    }

    #[test]
    fn result_json_round_trip() {
        let result = TranslationResult::new("/tmp/a.wav", Language::Ja, Language::Zh, vec![sample()]);
        let json = result.to_json().unwrap();
        assert!(json.contains("\"source_language\": \"ja\""));
        let back = TranslationResult::from_json(&json).unwrap();
        assert_eq!(back, result);
    }
}
