//! Loading normalized PCM files into memory
//!
//! The whole file is read at once; there is no streaming. Callers bound the
//! size through `Settings::max_file_bytes`.

use crate::config::Settings;
use crate::error::{IntakeError, Result};
use crate::types::Waveform;
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::debug;

/// Reads a WAV file into a [`Waveform`]
#[derive(Debug, Clone)]
pub struct WaveformLoader {
    max_file_bytes: u64,
}

impl WaveformLoader {
    pub fn new(max_file_bytes: u64) -> Self {
        Self { max_file_bytes }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_file_bytes)
    }

    pub fn load(&self, path: &Path) -> Result<Waveform> {
        let size = std::fs::metadata(path)
            .map_err(|e| IntakeError::decode_error(path, format!("Failed to read file metadata: {}", e)))?
            .len();

        if size > self.max_file_bytes {
            return Err(IntakeError::decode_error(
                path,
                format!(
                    "File too large ({:.1} MB). Limit is {:.1} MB.",
                    size as f64 / (1024.0 * 1024.0),
                    self.max_file_bytes as f64 / (1024.0 * 1024.0)
                ),
            ));
        }

        let reader = WavReader::open(path)
            .map_err(|e| IntakeError::decode_error(path, format!("Failed to open file: {}", e)))?;

        let spec = reader.spec();
        let declared = reader.len() as usize;
        if spec.channels == 0 {
            return Err(IntakeError::decode_error(path, "header declares zero channels"));
        }
        if declared % spec.channels as usize != 0 {
            return Err(IntakeError::decode_error(
                path,
                format!(
                    "{} samples do not divide into {} channels",
                    declared, spec.channels
                ),
            ));
        }

        let samples = read_samples(reader, spec.sample_format, spec.bits_per_sample)
            .map_err(|reason| IntakeError::decode_error(path, reason))?;

        if samples.len() != declared {
            return Err(IntakeError::decode_error(
                path,
                format!("header declares {} samples, found {}", declared, samples.len()),
            ));
        }

        debug!(
            "Loaded {}: {} frames @ {}Hz, {} channels",
            path.display(),
            samples.len() / spec.channels as usize,
            spec.sample_rate,
            spec.channels
        );

        Waveform::new(samples, spec.sample_rate, spec.channels).map_err(|e| match e {
            IntakeError::Decode { reason, .. } => IntakeError::decode_error(path, reason),
            other => other,
        })
    }
}

impl Default for WaveformLoader {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Read every sample as f32 in [-1.0, 1.0]
fn read_samples<R: std::io::Read>(
    mut reader: WavReader<R>,
    format: SampleFormat,
    bits: u16,
) -> std::result::Result<Vec<f32>, String> {
    match (format, bits) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| e.to_string()),
        (SampleFormat::Int, 1..=16) => {
            let scale = (1u32 << (bits - 1)) as f32;
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())
        }
        (SampleFormat::Int, 17..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())
        }
        (format, bits) => Err(format!("unsupported sample format {:?} {}-bit", format, bits)),
    }
}
