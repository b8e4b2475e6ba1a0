//! Normalization of arbitrary input to 16-bit PCM WAV
//!
//! Two backends share the [`Transcoder`] trait: ffmpeg as an external
//! process, and an in-process encoder (symphonia + rubato + hound) for
//! machines without ffmpeg.

use crate::audio::{decoder, resample};
use crate::config::{Settings, TranscoderKind};
use crate::error::{IntakeError, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Suffix appended to the full source file name for every normalized output
pub const NORMALIZED_SUFFIX: &str = "normalized.wav";

/// Converts an input file to 16-bit PCM at a fixed sample rate
pub trait Transcoder: Send + Sync {
    /// Write the normalized file and return its path
    ///
    /// The source file is never modified or removed.
    fn transcode(&self, input: &Path) -> Result<PathBuf>;

    /// Where [`Transcoder::transcode`] writes the output for `input`
    fn output_path(&self, input: &Path) -> PathBuf {
        normalized_path(input)
    }

    /// Sample rate of every file this transcoder writes
    fn target_sample_rate(&self) -> u32;

    /// Get the name of this transcoder (for logging)
    fn name(&self) -> &'static str;
}

/// Where the normalized copy of `input` is written
///
/// `<file name>.normalized.wav` in the same directory, e.g. `song.mp3` ->
/// `song.mp3.normalized.wav`. Keeping the source extension means two sources
/// never share an output, and the suffix means an output never has the name
/// of a plain source file.
pub fn normalized_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(NORMALIZED_SUFFIX);
    input.with_file_name(name)
}

/// Whether `path` is named like a file produced by [`normalized_path`]
pub fn is_normalized_output(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| {
            let n = n.to_ascii_lowercase();
            n.len() > NORMALIZED_SUFFIX.len() + 1
                && n.ends_with(NORMALIZED_SUFFIX)
                && n[..n.len() - NORMALIZED_SUFFIX.len()].ends_with('.')
        })
}

/// Pick the transcoder named in settings
///
/// `Auto` uses ffmpeg when the binary answers `-version`, otherwise the
/// in-process encoder.
pub fn select(settings: &Settings) -> Arc<dyn Transcoder> {
    let ffmpeg = FfmpegTranscoder::new(&settings.ffmpeg_path, settings.target_sample_rate);
    let native = NativeTranscoder::new(settings.target_sample_rate);

    let chosen: Arc<dyn Transcoder> = match settings.transcoder {
        TranscoderKind::Ffmpeg => Arc::new(ffmpeg),
        TranscoderKind::Native => Arc::new(native),
        TranscoderKind::Auto => {
            if ffmpeg.is_available() {
                Arc::new(ffmpeg)
            } else {
                warn!(
                    "ffmpeg not found at '{}', using built-in encoder",
                    settings.ffmpeg_path.display()
                );
                Arc::new(native)
            }
        }
    };

    info!(
        "Transcoding with {} at {} Hz",
        chosen.name(),
        chosen.target_sample_rate()
    );
    chosen
}

// =============================================================================
// ffmpeg
// =============================================================================

/// Runs an external ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    target_sample_rate: u32,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, target_sample_rate: u32) -> Self {
        Self {
            binary: binary.into(),
            target_sample_rate,
        }
    }

    /// Check that the binary can be executed
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn arguments(&self, input: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
            .iter()
            .map(Into::into)
            .collect();
        args.push(input.as_os_str().to_owned());
        for arg in [
            "-map_metadata",
            "-1",
            "-fflags",
            "+bitexact",
            "-flags:a",
            "+bitexact",
            "-acodec",
            "pcm_s16le",
            "-ar",
        ] {
            args.push(arg.into());
        }
        args.push(self.target_sample_rate.to_string().into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path) -> Result<PathBuf> {
        let output_path = self.output_path(input);
        debug!(
            "ffmpeg: {} -> {}",
            input.display(),
            output_path.display()
        );

        let output = Command::new(&self.binary)
            .args(self.arguments(input, &output_path))
            .output()
            .map_err(|e| {
                let diagnostic = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("ffmpeg not found at '{}'", self.binary.display())
                } else {
                    format!("failed to run ffmpeg: {}", e)
                };
                IntakeError::transcode_error(input, diagnostic)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let diagnostic = if stderr.is_empty() {
                format!("ffmpeg exited with {}", output.status)
            } else {
                stderr
            };
            return Err(IntakeError::transcode_error(input, diagnostic));
        }

        Ok(output_path)
    }

    fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

// =============================================================================
// In-process
// =============================================================================

/// Decodes with symphonia, resamples with rubato and writes with hound
#[derive(Debug, Clone)]
pub struct NativeTranscoder {
    target_sample_rate: u32,
}

impl NativeTranscoder {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    fn write_pcm16(&self, path: &Path, samples: &[f32], channels: usize) -> std::result::Result<(), hound::Error> {
        let spec = WavSpec {
            channels: channels as u16,
            sample_rate: self.target_sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::new(BufWriter::new(File::create(path)?), spec)?;
        for &s in samples {
            writer.write_sample(to_pcm16(s))?;
        }
        writer.finalize()
    }
}

impl Transcoder for NativeTranscoder {
    fn transcode(&self, input: &Path) -> Result<PathBuf> {
        let output_path = self.output_path(input);

        let decoded = decoder::decode(input).map_err(|e| match e {
            IntakeError::Decode { reason, .. } => IntakeError::transcode_error(input, reason),
            other => other,
        })?;

        if decoded.channels > u16::MAX as usize {
            return Err(IntakeError::transcode_error(
                input,
                format!("unsupported channel count {}", decoded.channels),
            ));
        }

        let samples = resample::resample_interleaved(
            &decoded.samples,
            decoded.channels,
            decoded.sample_rate,
            self.target_sample_rate,
        );

        debug!(
            "native: {} ({} frames, {} Hz, {} ch) -> {} ({} Hz)",
            input.display(),
            decoded.frames(),
            decoded.sample_rate,
            decoded.channels,
            output_path.display(),
            self.target_sample_rate
        );

        self.write_pcm16(&output_path, &samples, decoded.channels)
            .map_err(|e| IntakeError::transcode_error(input, e.to_string()))?;

        Ok(output_path)
    }

    fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// Full-scale f32 to i16, exact for values that came from 16-bit PCM
fn to_pcm16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_sine(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = ((i as f32 * 0.05).sin() * 12000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_normalized_path() {
        assert_eq!(
            normalized_path(Path::new("/m/song.mp3")),
            PathBuf::from("/m/song.mp3.normalized.wav")
        );
        assert_eq!(
            normalized_path(Path::new("/m/song.wav")),
            PathBuf::from("/m/song.wav.normalized.wav")
        );
        assert_eq!(
            normalized_path(Path::new("take.WAV")),
            PathBuf::from("take.WAV.normalized.wav")
        );
    }

    #[test]
    fn test_same_stem_sources_get_distinct_outputs() {
        let sources = ["song.mp3", "song.wav", "song.WAV", "song.flac", "song"];
        let outputs: std::collections::BTreeSet<PathBuf> = sources
            .iter()
            .map(|s| normalized_path(Path::new(s)))
            .collect();
        assert_eq!(outputs.len(), sources.len());
        for s in sources {
            assert!(!outputs.contains(Path::new(s)));
            assert!(!is_normalized_output(Path::new(s)));
        }
        assert!(outputs.iter().all(|o| is_normalized_output(o)));
        assert!(is_normalized_output(Path::new("/m/A.WAV.NORMALIZED.WAV")));
        assert!(!is_normalized_output(Path::new("normalized.wav")));
    }

    #[test]
    fn test_pcm16_conversion_is_exact_for_pcm16_input() {
        for v in [i16::MIN, -12345, -1, 0, 1, 12345, i16::MAX] {
            assert_eq!(to_pcm16(v as f32 / 32768.0), v);
        }
        assert_eq!(to_pcm16(2.0), i16::MAX);
        assert_eq!(to_pcm16(-2.0), i16::MIN);
    }

    #[test]
    fn test_native_resamples_and_keeps_channels() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        write_sine(&input, 48000, 2, 48000);

        let out = NativeTranscoder::new(44100).transcode(&input).unwrap();
        assert_eq!(out, dir.path().join("in.wav.normalized.wav"));
        assert!(input.exists());

        let reader = hound::WavReader::open(&out).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 16);
        assert!((reader.duration() as i64 - 44100).abs() < 64);
    }

    #[test]
    fn test_native_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        write_sine(&input, 22050, 1, 10000);

        let t = NativeTranscoder::new(44100);
        let out = t.transcode(&input).unwrap();
        let first = std::fs::read(&out).unwrap();
        t.transcode(&input).unwrap();
        assert_eq!(first, std::fs::read(&out).unwrap());
    }

    #[test]
    fn test_native_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.mp3");
        std::fs::write(&input, b"garbage").unwrap();
        let err = NativeTranscoder::new(44100).transcode(&input).unwrap_err();
        assert!(matches!(err, IntakeError::Transcode { .. }));
    }

    #[test]
    fn test_missing_ffmpeg_reports_diagnostic() {
        let t = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary", 44100);
        assert!(!t.is_available());
        let err = t.transcode(Path::new("song.mp3")).unwrap_err();
        match err {
            IntakeError::Transcode { diagnostic, .. } => {
                assert!(diagnostic.contains("ffmpeg not found"), "{diagnostic}")
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_select_honours_forced_kind() {
        let settings = Settings {
            transcoder: TranscoderKind::Native,
            target_sample_rate: 22050,
            ..Settings::default()
        };
        let t = select(&settings);
        assert_eq!(t.name(), "native");
        assert_eq!(t.target_sample_rate(), 22050);

        let settings = Settings {
            transcoder: TranscoderKind::Auto,
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg-binary"),
            ..Settings::default()
        };
        assert_eq!(select(&settings).name(), "native");
    }
}
