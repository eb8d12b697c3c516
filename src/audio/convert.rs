//! PCM preparation for the recognizer.
//!
//! WAV data is already decoded by the loader.  Anything else is transcoded
//! by an external `ffmpeg` process into a temporary 16 kHz mono WAV, which is
//! then decoded and deleted.

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};

use super::loader::{decode_wav, AudioData, AudioError};

/// 16 kHz mono samples for `audio`, decoding deferred formats on demand.
pub fn prepare_samples(audio: &AudioData) -> Result<Cow<'_, [f32]>, AudioError> {
    match &audio.samples {
        Some(samples) => Ok(Cow::Borrowed(samples.as_slice())),
        None => transcode(&audio.path).map(Cow::Owned),
    }
}

fn transcode(input: &Path) -> Result<Vec<f32>, AudioError> {
    let input_name = input.display().to_string();
    let tmp = tempfile::Builder::new()
        .prefix("subtitle-translator-")
        .suffix(".wav")
        .tempfile()
        .map_err(|e| AudioError::ConversionFailed {
            path: input_name.clone(),
            reason: format!("cannot create temporary file: {e}"),
        })?;

    log::debug!("audio: transcoding {input_name} via ffmpeg");

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le"])
        .arg(tmp.path())
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => AudioError::ConverterMissing(input_name.clone()),
            _ => AudioError::ConversionFailed {
                path: input_name.clone(),
                reason: e.to_string(),
            },
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.lines().last().unwrap_or("unknown error").to_string();
        return Err(AudioError::ConversionFailed {
            path: input_name,
            reason,
        });
    }

    // `tmp` is deleted when dropped at the end of this scope.
    decode_wav(tmp.path()).map(|wav| wav.samples)
}
