//! Selection state of a displayed waveform
//!
//! Policy for out-of-range requests: an inverted range (`end < start`) or a
//! non-finite bound is rejected and the previous selection is kept. Bounds
//! outside `[0, duration]` are clamped into it.

use crate::error::{IntakeError, Result};
use crate::types::{AudioMetadata, IntakeResult, Waveform};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::ops::Range;
use tracing::debug;

/// A time range in seconds, `0 <= start <= end <= duration`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRange {
    start_seconds: f64,
    end_seconds: f64,
}

impl SelectionRange {
    /// Validate and clamp a requested range against `duration`
    pub fn new(start: f64, end: f64, duration: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(IntakeError::Selection(format!(
                "bounds must be finite, got {start}..{end}"
            )));
        }
        if end < start {
            return Err(IntakeError::Selection(format!(
                "end {end:.3}s is before start {start:.3}s"
            )));
        }
        let duration = duration.max(0.0);
        Ok(Self {
            start_seconds: start.clamp(0.0, duration),
            end_seconds: end.clamp(0.0, duration),
        })
    }

    /// The whole of a `duration`-long waveform
    pub fn full(duration: f64) -> Self {
        Self {
            start_seconds: 0.0,
            end_seconds: duration.max(0.0),
        }
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_seconds
    }

    pub fn end_seconds(&self) -> f64 {
        self.end_seconds
    }

    pub fn length_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    pub fn is_empty(&self) -> bool {
        self.length_seconds() <= 0.0
    }
}

/// Reported to subscribers whenever the selection changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionChanged {
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// A delivered waveform on screen
pub struct WaveformView {
    waveform: Waveform,
    metadata: AudioMetadata,
    selection: SelectionRange,
    listeners: Vec<Sender<SelectionChanged>>,
}

impl WaveformView {
    /// Take ownership of a waveform; the selection starts as the full range
    pub fn new(waveform: Waveform, metadata: AudioMetadata) -> Self {
        let selection = SelectionRange::full(waveform.duration_seconds());
        Self {
            waveform,
            metadata,
            selection,
            listeners: Vec::new(),
        }
    }

    pub fn from_result(result: IntakeResult) -> Self {
        Self::new(result.waveform, result.metadata)
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn metadata(&self) -> &AudioMetadata {
        &self.metadata
    }

    pub fn duration_seconds(&self) -> f64 {
        self.waveform.duration_seconds()
    }

    pub fn selection(&self) -> SelectionRange {
        self.selection
    }

    /// Receive a [`SelectionChanged`] for every accepted selection
    pub fn subscribe(&mut self) -> Receiver<SelectionChanged> {
        let (tx, rx) = unbounded();
        self.listeners.push(tx);
        rx
    }

    /// Apply a user selection
    pub fn select(&mut self, start: f64, end: f64) -> Result<SelectionRange> {
        let range = SelectionRange::new(start, end, self.duration_seconds())?;
        self.selection = range;
        debug!(
            "Selection {:.3}s..{:.3}s",
            range.start_seconds(),
            range.end_seconds()
        );

        let event = SelectionChanged {
            start_seconds: range.start_seconds(),
            end_seconds: range.end_seconds(),
        };
        self.listeners.retain(|tx| tx.send(event).is_ok());
        Ok(range)
    }

    /// Frame indices covered by the current selection
    pub fn selected_frames(&self) -> Range<usize> {
        let rate = self.waveform.sample_rate() as f64;
        let frames = self.waveform.sample_count();
        let start = ((self.selection.start_seconds() * rate).floor() as usize).min(frames);
        let end = ((self.selection.end_seconds() * rate).ceil() as usize).min(frames);
        start..end
    }

    /// Interleaved samples covered by the current selection
    pub fn selected_samples(&self) -> &[f32] {
        let channels = self.waveform.channel_count() as usize;
        let frames = self.selected_frames();
        &self.waveform.samples()[frames.start * channels..frames.end * channels]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_second_view() -> WaveformView {
        let waveform = Waveform::new(vec![0.0; 100], 10, 1).unwrap();
        WaveformView::new(waveform, AudioMetadata::default())
    }

    #[test]
    fn test_initial_selection_is_full_range() {
        let view = ten_second_view();
        assert_eq!(view.selection(), SelectionRange::full(10.0));
        assert_eq!(view.selected_frames(), 0..100);
    }

    #[test]
    fn test_inverted_selection_is_rejected() {
        let mut view = ten_second_view();
        view.select(1.0, 3.0).unwrap();
        let err = view.select(2.0, 1.0).unwrap_err();
        assert!(matches!(err, IntakeError::Selection(_)));
        // Previous selection kept
        assert_eq!(view.selection().start_seconds(), 1.0);
        assert_eq!(view.selection().end_seconds(), 3.0);
    }

    #[test]
    fn test_out_of_range_bounds_are_clamped() {
        let mut view = ten_second_view();
        let range = view.select(-5.0, 42.0).unwrap();
        assert_eq!(range, SelectionRange::full(10.0));
        assert!(view.select(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_zero_length_selection_is_allowed() {
        let mut view = ten_second_view();
        let range = view.select(4.0, 4.0).unwrap();
        assert!(range.is_empty());
        assert!(view.selected_samples().is_empty());
    }

    #[test]
    fn test_subscribers_receive_changes() {
        let mut view = ten_second_view();
        let rx = view.subscribe();
        view.select(2.0, 5.0).unwrap();
        let _ = view.select(5.0, 2.0);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![SelectionChanged {
                start_seconds: 2.0,
                end_seconds: 5.0
            }]
        );
    }

    #[test]
    fn test_selected_samples_stereo() {
        let samples: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let waveform = Waveform::new(samples, 2, 2).unwrap();
        let mut view = WaveformView::new(waveform, AudioMetadata::default());
        view.select(0.5, 1.5).unwrap();
        assert_eq!(view.selected_frames(), 1..3);
        assert_eq!(view.selected_samples(), &[2.0, 3.0, 4.0, 5.0]);
    }
}
