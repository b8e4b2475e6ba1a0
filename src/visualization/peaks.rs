//! Min/max peak columns for drawing a waveform

use crate::types::Waveform;

/// Lowest and highest sample in one drawn column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub min: f32,
    pub max: f32,
}

/// Reduce `start..end` seconds of `waveform` to `columns` min/max pairs
///
/// `channel` selects one channel; `None` mixes all channels to mono first.
/// Columns past the end of the audio are flat at zero.
pub fn peak_columns(
    waveform: &Waveform,
    channel: Option<usize>,
    start_seconds: f64,
    end_seconds: f64,
    columns: usize,
) -> Vec<Peak> {
    if columns == 0 {
        return Vec::new();
    }

    let channels = waveform.channel_count() as usize;
    let frames: Vec<f32> = match channel {
        Some(c) if c < channels => waveform
            .samples()
            .iter()
            .skip(c)
            .step_by(channels)
            .copied()
            .collect(),
        Some(_) => return vec![Peak { min: 0.0, max: 0.0 }; columns],
        None => waveform.to_mono(),
    };

    let rate = waveform.sample_rate() as f64;
    let first = ((start_seconds.max(0.0) * rate) as usize).min(frames.len());
    let last = ((end_seconds.max(0.0) * rate).ceil() as usize).clamp(first, frames.len());
    let span = &frames[first..last];

    let per_column = span.len() as f64 / columns as f64;
    (0..columns)
        .map(|col| {
            let a = (col as f64 * per_column) as usize;
            let b = (((col + 1) as f64 * per_column) as usize).max(a + 1).min(span.len());
            let bin = span.get(a..b).unwrap_or(&[]);
            if bin.is_empty() {
                return Peak { min: 0.0, max: 0.0 };
            }
            let mut peak = Peak {
                min: f32::INFINITY,
                max: f32::NEG_INFINITY,
            };
            for &s in bin {
                peak.min = peak.min.min(s);
                peak.max = peak.max.max(s);
            }
            peak
        })
        .collect()
}
