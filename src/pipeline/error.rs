//! Failure taxonomy for a pipeline run.

use thiserror::Error;

use crate::audio::AudioError;
use crate::stt::SttError;
use crate::translate::TranslateError;

/// Why processing an item stopped.
///
/// Every variant carries a human-readable description so the UI can show it
/// without knowing the internal cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("unsupported format: {0}")]
    FormatUnsupported(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("could not load audio: {0}")]
    LoadFailed(String),

    #[error("speech recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("translation failed: {0}")]
    TranslationFailed(String),

    #[error("translation backend unreachable: {0}")]
    BackendUnreachable(String),

    /// The run was superseded by another one or stopped by the user.
    #[error("processing cancelled")]
    Cancelled,

    /// The identity is not in the queue.
    #[error("not in the queue: {0}")]
    NotQueued(String),

    /// The run's task died without reporting an outcome.
    #[error("processing stopped unexpectedly: {0}")]
    Aborted(String),
}

impl PipelineError {
    /// Whether retrying the same item later may succeed without any change
    /// to the file itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::BackendUnreachable(_) | PipelineError::Cancelled
        )
    }
}

impl From<AudioError> for PipelineError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::NotFound(path) => PipelineError::NotFound(path),
            AudioError::UnsupportedFormat(path) => PipelineError::FormatUnsupported(path),
            other => PipelineError::LoadFailed(other.to_string()),
        }
    }
}

impl From<SttError> for PipelineError {
    fn from(e: SttError) -> Self {
        match e {
            SttError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::RecognitionFailed(other.to_string()),
        }
    }
}

impl From<TranslateError> for PipelineError {
    fn from(e: TranslateError) -> Self {
        match e {
            TranslateError::BackendUnreachable { .. } => {
                PipelineError::BackendUnreachable(e.to_string())
            }
            other => PipelineError::TranslationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_errors_map_onto_taxonomy() {
        assert_eq!(
            PipelineError::from(AudioError::NotFound("a.wav".into())),
            PipelineError::NotFound("a.wav".into())
        );
        assert_eq!(
            PipelineError::from(AudioError::UnsupportedFormat("a.ogg".into())),
            PipelineError::FormatUnsupported("a.ogg".into())
        );
        assert!(matches!(
            PipelineError::from(AudioError::Unreadable {
                path: "a.wav".into(),
                reason: "bad header".into()
            }),
            PipelineError::LoadFailed(msg) if msg.contains("bad header")
        ));
    }

    #[test]
    fn recognizer_errors_are_recognition_failures() {
        let e = PipelineError::from(SttError::NoSpeech);
        assert_eq!(e, PipelineError::RecognitionFailed("no speech detected".into()));
        assert!(e.to_string().starts_with("speech recognition failed"));
        assert_eq!(PipelineError::from(SttError::Cancelled), PipelineError::Cancelled);
    }

    #[test]
    fn unreachable_backend_is_transient() {
        let e = PipelineError::from(TranslateError::BackendUnreachable {
            attempts: 3,
            reason: "refused".into(),
        });
        assert!(matches!(e, PipelineError::BackendUnreachable(_)));
        assert!(e.is_transient());

        let e = PipelineError::from(TranslateError::EmptyResponse);
        assert!(matches!(e, PipelineError::TranslationFailed(_)));
        assert!(!e.is_transient());
    }
}
