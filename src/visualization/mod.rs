//! Visualization surface for delivered waveforms
//!
//! Holds the waveform handed off by the pipeline, owns the current time
//! selection and produces min/max peak columns for drawing.

pub mod peaks;
pub mod selection;
pub mod terminal;

pub use peaks::{peak_columns, Peak};
pub use selection::{SelectionChanged, SelectionRange, WaveformView};
