//! Runtime configuration settings

use super::cli::{Cli, TranscoderArg};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Default accepted extensions
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["wav", "mp3", "flac"];

/// Reference sample rate for normalized output
pub const DEFAULT_TARGET_SAMPLE_RATE: u32 = 44100;

/// Maximum file size the loader will read into memory (2GB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Encoder used for normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscoderKind {
    /// ffmpeg when it is installed, otherwise the in-process encoder
    Auto,
    Ffmpeg,
    Native,
}

/// Runtime settings for the intake pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Lowercased extensions accepted by the validator
    pub accepted_extensions: BTreeSet<String>,
    /// Sample rate of the normalized PCM output
    pub target_sample_rate: u32,
    /// Encoder selection
    pub transcoder: TranscoderKind,
    /// ffmpeg binary to invoke
    pub ffmpeg_path: PathBuf,
    /// Files processed concurrently within a batch
    pub intake_threads: usize,
    /// Capacity of the per-batch event channel
    pub event_capacity: usize,
    /// Largest normalized file the loader will read
    pub max_file_bytes: u64,
    /// Expand directories recursively
    pub recursive: bool,
    /// Show progress bars
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &Cli) -> Self {
        let intake_threads = match cli.threads {
            0 => num_cpus::get().max(1),
            n => n,
        };

        Self {
            accepted_extensions: normalize_extensions(&cli.extensions),
            target_sample_rate: cli.target_rate,
            transcoder: match cli.transcoder {
                TranscoderArg::Auto => TranscoderKind::Auto,
                TranscoderArg::Ffmpeg => TranscoderKind::Ffmpeg,
                TranscoderArg::Native => TranscoderKind::Native,
            },
            ffmpeg_path: cli.ffmpeg.clone(),
            intake_threads,
            recursive: cli.recursive,
            show_progress: !cli.quiet,
            ..Self::default()
        }
    }

    /// Check values that would make the pipeline misbehave
    pub fn validate(&self) -> crate::Result<()> {
        if self.target_sample_rate == 0 {
            return Err(crate::IntakeError::Config(
                "target sample rate must be positive".to_string(),
            ));
        }
        if self.accepted_extensions.is_empty() {
            return Err(crate::IntakeError::Config(
                "at least one accepted extension is required".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(crate::IntakeError::Config(
                "event channel capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accepted_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            target_sample_rate: DEFAULT_TARGET_SAMPLE_RATE,
            transcoder: TranscoderKind::Auto,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            intake_threads: 1,
            event_capacity: 64,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            recursive: false,
            show_progress: true,
        }
    }
}

/// Lowercase, strip leading dots and drop empties
fn normalize_extensions(raw: &[String]) -> BTreeSet<String> {
    raw.iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli_normalizes_extensions() {
        let cli = Cli::parse_from(["stemintake", "--extensions", ".WAV, Mp3,", "x.wav"]);
        let settings = Settings::from_cli(&cli);
        let exts: Vec<_> = settings.accepted_extensions.iter().cloned().collect();
        assert_eq!(exts, vec!["mp3", "wav"]);
    }

    #[test]
    fn test_zero_threads_means_cpu_count() {
        let cli = Cli::parse_from(["stemintake", "-j", "0", "x.wav"]);
        assert!(Settings::from_cli(&cli).intake_threads >= 1);
    }

    #[test]
    fn test_validate() {
        assert!(Settings::default().validate().is_ok());
        let bad = Settings {
            target_sample_rate: 0,
            ..Settings::default()
        };
        assert!(bad.validate().is_err());
    }
}
