//! Sample conversion for the recognizer.
//!
//! Whisper wants **16 kHz mono `f32`**.  Decoded files arrive at any rate,
//! with any channel count, as integer or float PCM, so loading runs three
//! steps:
//!
//! 1. [`int_to_f32`] — scale integer PCM of a given bit depth into `[-1, 1]`.
//! 2. [`downmix`] — average interleaved channels into one.
//! 3. [`resample_to_16k`] — linear-interpolation rate conversion.

/// Rate the recognizer expects.
pub const TARGET_RATE: u32 = 16_000;

/// Scale signed integer PCM of `bits_per_sample` into `f32` in `[-1.0, 1.0)`.
///
/// ```rust
/// use subtitle_translator::audio::int_to_f32;
///
/// let out = int_to_f32(&[0, 16_384, -32_768], 16);
/// assert_eq!(out, vec![0.0, 0.5, -1.0]);
/// ```
pub fn int_to_f32(samples: &[i32], bits_per_sample: u16) -> Vec<f32> {
    let bits = bits_per_sample.clamp(1, 32) as i32;
    let scale = (1u64 << (bits - 1)) as f32;
    samples.iter().map(|&s| s as f32 / scale).collect()
}

/// Average interleaved multi-channel audio down to mono.
///
/// `channels == 1` returns the input unchanged; `channels == 0` yields an
/// empty buffer.  A trailing partial frame is dropped.
pub fn downmix(samples: Vec<f32>, channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples,
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Resample mono `samples` from `source_rate` Hz to [`TARGET_RATE`].
///
/// The output length is `ceil(len * 16000 / source_rate)`.
///
/// ```rust
/// use subtitle_translator::audio::resample_to_16k;
///
/// let lo = resample_to_16k(vec![0.5_f32; 480], 48_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn resample_to_16k(samples: Vec<f32>, source_rate: u32) -> Vec<f32> {
    if source_rate == TARGET_RATE || source_rate == 0 || samples.is_empty() {
        return samples;
    }

    let ratio = TARGET_RATE as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = (src_pos as usize).min(last);
            let frac = (src_pos - idx as f64) as f32;
            if idx < last {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            } else {
                samples[last]
            }
        })
        .collect()
}
