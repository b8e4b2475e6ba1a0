//! Core data types for stemintake
//!
//! These types represent the domain model and flow through the pipeline.

use crate::error::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// File lifecycle
// =============================================================================

/// Lifecycle state of a submitted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileState {
    Pending,
    Validated,
    Rejected,
    MetadataExtracted,
    Transcoded,
    Loaded,
    Delivered,
    Failed,
    Cancelled,
}

impl FileState {
    pub fn name(self) -> &'static str {
        match self {
            FileState::Pending => "Pending",
            FileState::Validated => "Validated",
            FileState::Rejected => "Rejected",
            FileState::MetadataExtracted => "MetadataExtracted",
            FileState::Transcoded => "Transcoded",
            FileState::Loaded => "Loaded",
            FileState::Delivered => "Delivered",
            FileState::Failed => "Failed",
            FileState::Cancelled => "Cancelled",
        }
    }

    /// Terminal states emit no further events
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FileState::Rejected | FileState::Delivered | FileState::Failed | FileState::Cancelled
        )
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: FileState) -> bool {
        use FileState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Pending, Validated) | (Pending, Rejected) => true,
            (Validated, MetadataExtracted) => true,
            (MetadataExtracted, Transcoded) => true,
            (Transcoded, Loaded) => true,
            (Loaded, Delivered) => true,
            (_, Failed) | (_, Cancelled) => true,
            _ => false,
        }
    }
}

/// A submitted path and where it is in the pipeline
#[derive(Debug, Clone)]
pub struct AudioFileRef {
    pub path: PathBuf,
    state: FileState,
}

impl AudioFileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: FileState::Pending,
        }
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    /// Move to `next`, refusing transitions the state machine does not allow
    pub fn advance(&mut self, next: FileState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(IntakeError::InvalidTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        self.state = next;
        Ok(())
    }
}

// =============================================================================
// Metadata and samples
// =============================================================================

/// Metadata read from an audio file's tags and stream properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// Mime type reported for the container (empty if unknown)
    pub format: String,
    pub duration_seconds: f64,
    /// Bits per second, 0 when the file does not report one
    pub bitrate_bps: u64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub tags: BTreeMap<String, String>,
}

/// Decoded audio, interleaved by channel
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
    channel_count: u16,
}

impl Waveform {
    /// Build a waveform, rejecting layouts where the sample total does not
    /// split evenly into frames
    pub fn new(samples: Vec<f32>, sample_rate: u32, channel_count: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(IntakeError::decode_error("", "sample rate must be positive"));
        }
        if channel_count == 0 {
            return Err(IntakeError::decode_error("", "channel count must be positive"));
        }
        if samples.len() % channel_count as usize != 0 {
            return Err(IntakeError::decode_error(
                "",
                format!(
                    "{} samples do not divide into {} channels",
                    samples.len(),
                    channel_count
                ),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
            channel_count,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Samples per channel (frames)
    pub fn sample_count(&self) -> usize {
        self.samples.len() / self.channel_count as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        self.sample_count() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channel_count as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Transient progress report for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    /// 0..=100
    pub percent: u8,
    pub message: String,
}

impl PipelineProgress {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
        }
    }
}

/// Everything delivered for one successfully processed file
#[derive(Debug, Clone)]
pub struct IntakeResult {
    pub source: PathBuf,
    pub normalized: PathBuf,
    pub metadata: AudioMetadata,
    pub waveform: Waveform,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Aiff,
    Ogg,
    M4a,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "aiff" | "aif" => Some(AudioFormat::Aiff),
            "ogg" => Some(AudioFormat::Ogg),
            "m4a" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_happy_path() {
        let mut file = AudioFileRef::new("a.wav");
        for next in [
            FileState::Validated,
            FileState::MetadataExtracted,
            FileState::Transcoded,
            FileState::Loaded,
            FileState::Delivered,
        ] {
            file.advance(next).unwrap();
        }
        assert_eq!(file.state(), FileState::Delivered);
        assert!(file.advance(FileState::Failed).is_err());
    }

    #[test]
    fn test_state_machine_rejects_skipping_stages() {
        let mut file = AudioFileRef::new("a.wav");
        file.advance(FileState::Validated).unwrap();
        let err = file.advance(FileState::Loaded).unwrap_err();
        assert!(matches!(err, IntakeError::InvalidTransition { from: "Validated", to: "Loaded" }));
    }

    #[test]
    fn test_failed_and_cancelled_reachable_after_validation() {
        let mut file = AudioFileRef::new("a.wav");
        file.advance(FileState::Validated).unwrap();
        file.advance(FileState::Failed).unwrap();

        let mut file = AudioFileRef::new("a.wav");
        file.advance(FileState::Cancelled).unwrap();
        assert!(file.state().is_terminal());
    }

    #[test]
    fn test_waveform_layout_invariant() {
        let w = Waveform::new(vec![0.0; 10], 44100, 2).unwrap();
        assert_eq!(w.sample_count() * w.channel_count() as usize, w.samples().len());
        assert!(Waveform::new(vec![0.0; 9], 44100, 2).is_err());
        assert!(Waveform::new(vec![0.0; 8], 0, 2).is_err());
        assert!(Waveform::new(vec![0.0; 8], 44100, 0).is_err());
    }

    #[test]
    fn test_waveform_duration_and_mono() {
        let w = Waveform::new(vec![0.5, 0.3, 0.8, 0.2], 2, 2).unwrap();
        assert_eq!(w.sample_count(), 2);
        assert!((w.duration_seconds() - 1.0).abs() < 1e-9);
        let mono = w.to_mono();
        assert!((mono[0] - 0.4).abs() < 0.001);
        assert!((mono[1] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_format_from_extension_case_insensitive() {
        assert_eq!(AudioFormat::from_extension("MP3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_extension("Flac"), Some(AudioFormat::Flac));
        assert_eq!(AudioFormat::from_extension("txt"), None);
    }
}
