//! CLI argument parsing and configuration

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// stemintake - audio intake for stem separation
///
/// Validates, transcodes to 16-bit PCM and loads audio files so they can be
/// inspected and handed to a separation model.
#[derive(Parser, Debug)]
#[command(name = "stemintake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Audio files or directories to ingest
    #[arg(value_name = "PATHS", required = true)]
    pub paths: Vec<PathBuf>,

    /// Sample rate of the normalized PCM output
    #[arg(long, value_name = "HZ", default_value_t = 44100)]
    pub target_rate: u32,

    /// Accepted file extensions (comma separated)
    #[arg(long, value_name = "LIST", value_delimiter = ',', default_value = "wav,mp3,flac")]
    pub extensions: Vec<String>,

    /// Which encoder to use for normalization
    #[arg(long, value_enum, default_value_t = TranscoderArg::Auto)]
    pub transcoder: TranscoderArg,

    /// Path to the ffmpeg binary
    #[arg(long, value_name = "PATH", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Number of files processed in parallel (0 = CPU count)
    #[arg(short = 'j', long, value_name = "N", default_value_t = 1)]
    pub threads: usize,

    /// Scan dropped directories recursively
    #[arg(short, long, default_value = "false")]
    pub recursive: bool,

    /// Print an ASCII waveform for each delivered file
    #[arg(long, default_value = "false")]
    pub plot: bool,

    /// Select a time range (seconds) on each delivered waveform, e.g. 1.5:4
    #[arg(long, value_name = "START:END")]
    pub select: Option<String>,

    /// Store the UI theme preference
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Run the named stub model on each delivered waveform
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

/// Encoder selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TranscoderArg {
    Auto,
    Ffmpeg,
    Native,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Parse `--select START:END` into seconds
    pub fn selection(&self) -> Option<Result<(f64, f64), String>> {
        self.select.as_deref().map(parse_range)
    }
}

fn parse_range(raw: &str) -> Result<(f64, f64), String> {
    let (start, end) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{raw}'"))?;
    let start: f64 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start '{start}'"))?;
    let end: f64 = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end '{end}'"))?;
    Ok((start, end))
}
