//! Audio I/O: tag reading, decoding, normalization and waveform loading

pub mod decoder;
pub mod loader;
pub mod metadata;
pub mod resample;
pub mod transcoder;

pub use decoder::{decode, DecodedAudio};
pub use loader::WaveformLoader;
pub use metadata::MetadataExtractor;
pub use transcoder::{is_normalized_output, normalized_path, FfmpegTranscoder, NativeTranscoder, Transcoder};
