//! Typed events sent from the worker to the interactive side

use crate::error::IntakeError;
use crate::types::{FileState, IntakeResult, PipelineProgress};
use std::path::{Path, PathBuf};

/// Index of a file within its submitted batch
pub type FileId = usize;

/// Everything the pipeline reports while a batch runs
///
/// Every file gets exactly one terminal event (`Delivered`, `Failed` or
/// `Cancelled`), preceded by its progress events in stage order.
/// `BatchFinished` is always the last event of a batch.
#[derive(Debug)]
pub enum PipelineEvent {
    Progress {
        file: FileId,
        path: PathBuf,
        progress: PipelineProgress,
    },
    Delivered {
        file: FileId,
        result: Box<IntakeResult>,
    },
    Failed {
        file: FileId,
        path: PathBuf,
        error: IntakeError,
    },
    Cancelled {
        file: FileId,
        path: PathBuf,
    },
    BatchFinished(BatchSummary),
}

impl PipelineEvent {
    /// The file this event belongs to, `None` for batch-level events
    pub fn file(&self) -> Option<FileId> {
        match self {
            PipelineEvent::Progress { file, .. }
            | PipelineEvent::Delivered { file, .. }
            | PipelineEvent::Failed { file, .. }
            | PipelineEvent::Cancelled { file, .. } => Some(*file),
            PipelineEvent::BatchFinished(_) => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            PipelineEvent::Progress { path, .. }
            | PipelineEvent::Failed { path, .. }
            | PipelineEvent::Cancelled { path, .. } => Some(path),
            PipelineEvent::Delivered { result, .. } => Some(&result.source),
            PipelineEvent::BatchFinished(_) => None,
        }
    }

    /// Whether this is the last event for its file
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::Delivered { .. }
                | PipelineEvent::Failed { .. }
                | PipelineEvent::Cancelled { .. }
        )
    }
}

/// Pipeline result summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    /// Count one file by its terminal state
    pub fn record(&mut self, state: FileState) {
        self.total += 1;
        match state {
            FileState::Delivered => self.delivered += 1,
            FileState::Cancelled => self.cancelled += 1,
            _ => self.failed += 1,
        }
    }

    /// Count one file from its terminal event
    pub fn record_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Delivered { .. } => self.record(FileState::Delivered),
            PipelineEvent::Cancelled { .. } => self.record(FileState::Cancelled),
            PipelineEvent::Failed { .. } => self.record(FileState::Failed),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_terminal_states() {
        let mut s = BatchSummary::default();
        s.record(FileState::Delivered);
        s.record(FileState::Rejected);
        s.record(FileState::Failed);
        s.record(FileState::Cancelled);
        assert_eq!(
            s,
            BatchSummary {
                total: 4,
                delivered: 1,
                failed: 2,
                cancelled: 1
            }
        );
    }

    #[test]
    fn test_event_accessors() {
        let e = PipelineEvent::Cancelled {
            file: 3,
            path: PathBuf::from("a.mp3"),
        };
        assert_eq!(e.file(), Some(3));
        assert!(e.is_terminal());
        assert_eq!(e.path(), Some(Path::new("a.mp3")));
        assert!(!PipelineEvent::BatchFinished(BatchSummary::default()).is_terminal());
    }
}
