//! stemintake - Audio intake pipeline for stem separation
//!
//! Takes user-supplied audio files, rejects unsupported ones, reads their
//! metadata, normalizes them to 16-bit PCM WAV and loads the result into
//! memory for display and downstream models.
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing, runtime settings and stored preferences
//! - `discovery`: Input expansion and extension validation
//! - `audio`: Metadata, transcoding, decoding and waveform loading
//! - `pipeline`: Background batch processing with typed events
//! - `visualization`: Selection handling and peak computation for display
//! - `model`: Placeholder model registry driven from a worker thread
//!
//! # Example
//!
//! ```no_run
//! use stemintake::config::Settings;
//! use stemintake::pipeline::{IntakePipeline, PipelineEvent};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let pipeline = Arc::new(IntakePipeline::from_settings(&Settings::default()).unwrap());
//! let batch = pipeline.submit(vec![PathBuf::from("track.mp3")]);
//! for event in batch.events() {
//!     if let PipelineEvent::Delivered { result, .. } = event {
//!         println!("{} frames", result.waveform.sample_count());
//!     }
//! }
//! ```

pub mod audio;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod types;
pub mod visualization;

// Re-export key types at crate root
pub use error::{IntakeError, Result};
pub use types::{AudioFileRef, AudioFormat, AudioMetadata, FileState, IntakeResult, Waveform};
