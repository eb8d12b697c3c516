//! Pipeline stages and their share of the overall progress bar.
//!
//! A run moves through four stages in order.  Each stage owns a fixed slice
//! of the `0.0..=1.0` pipeline-wide progress range:
//!
//! ```text
//! 0.00 ─ Loading ─ 0.10 ─ Recognizing ─ 0.70 ─ Translating ─ 0.95 ─ Finalizing ─ 1.00
//! ```
//!
//! Recognition dominates wall-clock time, so it gets the widest band.

/// The stage a pipeline run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading and decoding the media file.
    Loading,
    /// Speech recognition is running on the blocking thread pool.
    Recognizing,
    /// Segments are being sent to the translation backend.
    Translating,
    /// Result assembly before the completion event.
    Finalizing,
}

impl Stage {
    /// All stages, in execution order.
    pub const ORDER: [Stage; 4] = [
        Stage::Loading,
        Stage::Recognizing,
        Stage::Translating,
        Stage::Finalizing,
    ];

    /// `(start, end)` of this stage's slice of the overall progress range.
    ///
    /// ```
    /// use subtitle_translator::pipeline::Stage;
    ///
    /// assert_eq!(Stage::Loading.band(), (0.0, 0.10));
    /// assert_eq!(Stage::Finalizing.band().1, 1.0);
    /// ```
    pub fn band(self) -> (f32, f32) {
        match self {
            Stage::Loading => (0.0, 0.10),
            Stage::Recognizing => (0.10, 0.70),
            Stage::Translating => (0.70, 0.95),
            Stage::Finalizing => (0.95, 1.0),
        }
    }

    /// Map a stage-local fraction (`0.0..=1.0`) into the overall range.
    /// Out-of-range and NaN inputs are clamped.
    pub fn scale(self, local: f32) -> f32 {
        let (start, end) = self.band();
        let local = if local.is_nan() { 0.0 } else { local.clamp(0.0, 1.0) };
        start + (end - start) * local
    }

    /// A short human-readable label for status display.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Loading => "Loading audio",
            Stage::Recognizing => "Recognizing speech",
            Stage::Translating => "Translating",
            Stage::Finalizing => "Finishing",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_contiguous_and_cover_unit_range() {
        let mut expected_start = 0.0;
        for stage in Stage::ORDER {
            let (start, end) = stage.band();
            assert!((start - expected_start).abs() < f32::EPSILON, "{stage:?}");
            assert!(end > start);
            expected_start = end;
        }
        assert!((expected_start - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn band_widths_match_stage_weights() {
        let width = |s: Stage| s.band().1 - s.band().0;
        assert!((width(Stage::Loading) - 0.10).abs() < 1e-6);
        assert!((width(Stage::Recognizing) - 0.60).abs() < 1e-6);
        assert!((width(Stage::Translating) - 0.25).abs() < 1e-6);
        assert!((width(Stage::Finalizing) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn scale_maps_into_band() {
        assert!((Stage::Recognizing.scale(0.5) - 0.40).abs() < 1e-6);
        assert_eq!(Stage::Recognizing.scale(0.0), 0.10);
        assert!((Stage::Translating.scale(1.0) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn scale_clamps_bad_input() {
        assert_eq!(Stage::Loading.scale(-3.0), 0.0);
        assert_eq!(Stage::Loading.scale(7.0), 0.10);
        assert_eq!(Stage::Finalizing.scale(f32::NAN), 0.95);
    }

    #[test]
    fn labels_are_distinct() {
        let labels: std::collections::HashSet<_> =
            Stage::ORDER.iter().map(|s| s.label()).collect();
        assert_eq!(labels.len(), 4);
    }
}
