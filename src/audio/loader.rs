//! Audio loader collaborator: path → [`AudioData`].
//!
//! Only two containers are admitted: `.wav` and `.mp3`.  WAV files are
//! decoded in-process with `hound`; MP3 files are only measured here (size
//! based duration estimate) and are transcoded by
//! [`prepare_samples`](super::prepare_samples) when the recognizer needs PCM.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::resample::{downmix, int_to_f32, resample_to_16k};

/// File extensions (lower-case, without the dot) the application accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

/// Rough MP3 byte rate used for duration estimates (128 kbit/s).
const MP3_BYTES_PER_SEC: f64 = 16_000.0;

/// Whether `path` has an allow-listed extension (case-insensitive).
///
/// ```
/// use subtitle_translator::audio::is_supported_format;
///
/// assert!(is_supported_format("talk.WAV"));
/// assert!(is_supported_format("/music/song.mp3"));
/// assert!(!is_supported_format("notes.txt"));
/// assert!(!is_supported_format(""));
/// ```
pub fn is_supported_format(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Why a file could not be loaded.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("unsupported format: {0} (only wav and mp3 are supported)")]
    UnsupportedFormat(String),

    #[error("cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("ffmpeg not found on PATH; it is required to decode {0}")]
    ConverterMissing(String),

    #[error("ffmpeg failed on {path}: {reason}")]
    ConversionFailed { path: String, reason: String },
}

// ---------------------------------------------------------------------------
// AudioData
// ---------------------------------------------------------------------------

/// A loaded media file.
#[derive(Debug, Clone)]
pub struct AudioData {
    pub path: PathBuf,
    /// Duration in seconds (estimated for MP3).
    pub duration_secs: f64,
    /// Native sample rate of the file.
    pub sample_rate: u32,
    /// Native channel count of the file.
    pub channels: u16,
    /// 16 kHz mono PCM, or `None` when decoding is deferred (MP3).
    pub samples: Option<Vec<f32>>,
}

/// Decoded WAV contents, already converted to 16 kHz mono.
#[derive(Debug, Clone)]
pub struct DecodedWav {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
}

/// Decode a WAV file of any integer/float format into 16 kHz mono `f32`.
pub fn decode_wav(path: &Path) -> Result<DecodedWav, AudioError> {
    let unreadable = |reason: String| AudioError::Unreadable {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = hound::WavReader::open(path).map_err(|e| unreadable(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| unreadable(e.to_string()))?,
        hound::SampleFormat::Int => {
            let raw = reader
                .samples::<i32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| unreadable(e.to_string()))?;
            int_to_f32(&raw, spec.bits_per_sample)
        }
    };

    let channels = spec.channels.max(1);
    let frames = interleaved.len() / channels as usize;
    let duration_secs = if spec.sample_rate > 0 {
        frames as f64 / spec.sample_rate as f64
    } else {
        0.0
    };

    let mono = downmix(interleaved, channels);
    Ok(DecodedWav {
        samples: resample_to_16k(mono, spec.sample_rate),
        sample_rate: spec.sample_rate,
        channels,
        duration_secs,
    })
}

// ---------------------------------------------------------------------------
// AudioLoader trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for loading media files.
///
/// Runs on the blocking thread pool; implementations may do file I/O.
pub trait AudioLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<AudioData, AudioError>;
}

// ---------------------------------------------------------------------------
// FileAudioLoader
// ---------------------------------------------------------------------------

/// Production loader reading from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileAudioLoader;

impl FileAudioLoader {
    pub fn new() -> Self {
        Self
    }

    fn load_mp3(path: &Path) -> Result<AudioData, AudioError> {
        let size = std::fs::metadata(path)
            .map_err(|e| AudioError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
            .len();

        Ok(AudioData {
            path: path.to_path_buf(),
            duration_secs: size as f64 / MP3_BYTES_PER_SEC,
            sample_rate: 44_100,
            channels: 2,
            samples: None,
        })
    }
}

impl AudioLoader for FileAudioLoader {
    fn load(&self, path: &Path) -> Result<AudioData, AudioError> {
        if !path.is_file() {
            return Err(AudioError::NotFound(path.display().to_string()));
        }
        if !is_supported_format(path) {
            return Err(AudioError::UnsupportedFormat(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let data = if ext == "mp3" {
            Self::load_mp3(path)?
        } else {
            let wav = decode_wav(path)?;
            AudioData {
                path: path.to_path_buf(),
                duration_secs: wav.duration_secs,
                sample_rate: wav.sample_rate,
                channels: wav.channels,
                samples: Some(wav.samples),
            }
        };

        log::debug!(
            "audio: loaded {} ({:.1}s, {} Hz, {} ch)",
            path.display(),
            data.duration_secs,
            data.sample_rate,
            data.channels
        );
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// MockLoader  (test-only)
// ---------------------------------------------------------------------------

/// Test double returning a fixed clip (or error) and counting calls.
#[cfg(test)]
pub struct MockLoader {
    response: Result<AudioData, AudioError>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockLoader {
    /// Loader returning one second of silence for any path.
    pub fn ok() -> Self {
        Self {
            response: Ok(AudioData {
                path: PathBuf::new(),
                duration_secs: 1.0,
                sample_rate: 16_000,
                channels: 1,
                samples: Some(vec![0.0; 16_000]),
            }),
            calls: Default::default(),
        }
    }

    pub fn err(error: AudioError) -> Self {
        Self {
            response: Err(error),
            calls: Default::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl AudioLoader for MockLoader {
    fn load(&self, path: &Path) -> Result<AudioData, AudioError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone().map(|mut data| {
            data.path = path.to_path_buf();
            data
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_stereo_wav_as_16k_mono() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        // 0.5 s of stereo at 32 kHz.
        write_wav(&path, 32_000, 2, &vec![8_192_i16; 32_000]);

        let data = FileAudioLoader::new().load(&path).unwrap();
        assert!((data.duration_secs - 0.5).abs() < 1e-9);
        assert_eq!(data.sample_rate, 32_000);
        assert_eq!(data.channels, 2);

        let samples = data.samples.unwrap();
        assert_eq!(samples.len(), 8_000);
        assert!((samples[100] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = FileAudioLoader::new()
            .load(Path::new("/definitely/not/here.wav"))
            .unwrap_err();
        assert!(matches!(err, AudioError::NotFound(_)));
    }

    #[test]
    fn existing_file_with_bad_extension_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.ogg");
        std::fs::write(&path, b"OggS").unwrap();
        let err = FileAudioLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedFormat(_)));
    }

    #[test]
    fn corrupt_wav_is_unreadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"not a riff header").unwrap();
        let err = FileAudioLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, AudioError::Unreadable { .. }));
    }

    #[test]
    fn mp3_is_measured_not_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("song.MP3");
        std::fs::write(&path, vec![0u8; 32_000]).unwrap();
        let data = FileAudioLoader::new().load(&path).unwrap();
        assert!((data.duration_secs - 2.0).abs() < 1e-9);
        assert!(data.samples.is_none());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported_format("A.Wav"));
        assert!(!is_supported_format("a.wave"));
        assert!(!is_supported_format("mp3"));
    }
}
