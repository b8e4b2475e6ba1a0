//! Sample-rate conversion using rubato
//!
//! FFT-based resampling with a linear fallback when rubato cannot be set up.

use rubato::{FftFixedInOut, Resampler};
use tracing::debug;

/// rubato works on fixed-size chunks
const CHUNK_SIZE: usize = 1024;

/// Resample interleaved audio, one channel at a time
pub fn resample_interleaved(
    samples: &[f32],
    channels: usize,
    from_rate: u32,
    to_rate: u32,
) -> Vec<f32> {
    if from_rate == to_rate || channels == 0 {
        return samples.to_vec();
    }
    if channels == 1 {
        return resample(samples, from_rate, to_rate);
    }

    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|c| samples.iter().skip(c).step_by(channels).copied().collect())
        .collect();
    let resampled: Vec<Vec<f32>> = planar
        .iter()
        .map(|ch| resample(ch, from_rate, to_rate))
        .collect();

    let frames = resampled.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        for ch in &resampled {
            out.push(ch[i]);
        }
    }
    out
}

/// Resample a single channel
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let mut resampler =
        match FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 1) {
            Ok(r) => r,
            Err(e) => {
                debug!("Rubato initialization failed ({}), using fallback", e);
                return resample_linear_fallback(samples, from_rate, to_rate);
            }
        };

    let input_frames_per_chunk = resampler.input_frames_next();
    let output_frames_per_chunk = resampler.output_frames_next();

    let ratio = to_rate as f64 / from_rate as f64;
    let mut output = Vec::with_capacity((samples.len() as f64 * ratio).ceil() as usize);

    let mut pos = 0;
    while pos < samples.len() {
        let end = (pos + input_frames_per_chunk).min(samples.len());
        let mut chunk = samples[pos..end].to_vec();
        if chunk.len() < input_frames_per_chunk {
            chunk.resize(input_frames_per_chunk, 0.0);
        }

        match resampler.process(&[chunk], None) {
            Ok(resampled) => {
                if let Some(channel) = resampled.first() {
                    let valid = if pos + input_frames_per_chunk > samples.len() {
                        let input_valid = samples.len() - pos;
                        ((input_valid as f64 * ratio).ceil() as usize).min(output_frames_per_chunk)
                    } else {
                        output_frames_per_chunk
                    };
                    output.extend_from_slice(&channel[..valid.min(channel.len())]);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), using fallback for remaining", e);
                output.extend(resample_linear_fallback(&samples[pos..], from_rate, to_rate));
                break;
            }
        }

        pos += input_frames_per_chunk;
    }

    output
}

/// Linear interpolation; may alias, only used when rubato fails
fn resample_linear_fallback(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio) as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let src_idx = src_pos as usize;
            let frac = (src_pos - src_idx as f64) as f32;
            if src_idx + 1 < samples.len() {
                samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
            } else {
                samples[src_idx.min(samples.len() - 1)]
            }
        })
        .collect()
}
