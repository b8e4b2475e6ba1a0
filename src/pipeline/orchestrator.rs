//! Pipeline orchestration
//!
//! Drives each file through validate -> metadata -> transcode -> load on a
//! background worker and reports typed events on a bounded channel. Files
//! run sequentially by default, or on a local rayon pool when more than one
//! intake thread is configured.

use crate::audio::{self, MetadataExtractor, Transcoder, WaveformLoader};
use crate::config::Settings;
use crate::discovery::{self, FileValidator, Validation};
use crate::error::{IntakeError, Result};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::events::{BatchSummary, FileId, PipelineEvent};
use crate::types::{AudioFileRef, FileState, IntakeResult, PipelineProgress};
use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::prelude::*;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Progress reported after each stage completes
const PROGRESS_VALIDATED: u8 = 10;
const PROGRESS_METADATA: u8 = 30;
const PROGRESS_TRANSCODED: u8 = 70;
const PROGRESS_LOADED: u8 = 100;

/// Run a batch to completion on the calling thread's behalf
///
/// Directories in `inputs` are expanded first. Events are drained and only
/// the summary is returned; use [`IntakePipeline::submit`] to observe them.
pub fn run(inputs: &[PathBuf], settings: &Settings) -> Result<BatchSummary> {
    let pipeline = Arc::new(IntakePipeline::from_settings(settings)?);
    let files = discovery::expand_inputs(inputs, settings.recursive);
    Ok(pipeline.submit(files).wait())
}

/// Validator, metadata reader, transcoder and loader wired together
pub struct IntakePipeline {
    validator: FileValidator,
    extractor: MetadataExtractor,
    transcoder: Arc<dyn Transcoder>,
    loader: WaveformLoader,
    intake_threads: usize,
    event_capacity: usize,
}

impl IntakePipeline {
    pub fn new(
        settings: &Settings,
        validator: FileValidator,
        extractor: MetadataExtractor,
        transcoder: Arc<dyn Transcoder>,
        loader: WaveformLoader,
    ) -> Self {
        Self {
            validator,
            extractor,
            transcoder,
            loader,
            intake_threads: settings.intake_threads.max(1),
            event_capacity: settings.event_capacity.max(1),
        }
    }

    /// Build the default components described by `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::new(
            settings,
            FileValidator::from_settings(settings),
            MetadataExtractor::new(),
            audio::transcoder::select(settings),
            WaveformLoader::from_settings(settings),
        ))
    }

    /// Start processing `paths` on a background thread
    ///
    /// Returns immediately; progress, results and errors arrive on the
    /// handle's event channel.
    pub fn submit(self: &Arc<Self>, paths: Vec<PathBuf>) -> BatchHandle {
        let (tx, rx) = bounded::<PipelineEvent>(self.event_capacity);
        let cancel = CancelToken::new();

        let pipeline = Arc::clone(self);
        let worker_cancel = cancel.clone();
        let worker = thread::Builder::new()
            .name("intake-worker".to_string())
            .spawn(move || pipeline.run_batch(paths, tx, worker_cancel));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                // The sender was moved into the failed closure and dropped,
                // so the receiver reports disconnection straight away.
                error!("Failed to spawn intake worker: {}", e);
                None
            }
        };

        BatchHandle {
            events: rx,
            cancel,
            worker,
        }
    }

    fn run_batch(&self, paths: Vec<PathBuf>, tx: Sender<PipelineEvent>, cancel: CancelToken) {
        let started = Instant::now();
        info!("Processing {} files", paths.len());
        let batch: HashSet<PathBuf> = paths.iter().cloned().collect();

        let states: Vec<FileState> = if self.intake_threads > 1 && paths.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.intake_threads)
                .thread_name(|i| format!("intake-{i}"))
                .build()
            {
                Ok(pool) => pool.install(|| {
                    paths
                        .par_iter()
                        .enumerate()
                        .map(|(id, path)| self.process_guarded(id, path, &batch, &tx, &cancel))
                        .collect()
                }),
                Err(e) => {
                    warn!("Failed to build intake thread pool ({}), running sequentially", e);
                    self.run_sequential(&paths, &batch, &tx, &cancel)
                }
            }
        } else {
            self.run_sequential(&paths, &batch, &tx, &cancel)
        };

        let mut summary = BatchSummary::default();
        for state in states {
            summary.record(state);
        }

        info!(
            "Batch finished in {:.2}s: {} delivered, {} failed, {} cancelled",
            started.elapsed().as_secs_f64(),
            summary.delivered,
            summary.failed,
            summary.cancelled
        );

        let _ = tx.send(PipelineEvent::BatchFinished(summary));
    }

    fn run_sequential(
        &self,
        paths: &[PathBuf],
        batch: &HashSet<PathBuf>,
        tx: &Sender<PipelineEvent>,
        cancel: &CancelToken,
    ) -> Vec<FileState> {
        paths
            .iter()
            .enumerate()
            .map(|(id, path)| self.process_guarded(id, path, batch, tx, cancel))
            .collect()
    }

    /// [`Self::process_file`], turning a panic into a `Failed` event
    fn process_guarded(
        &self,
        id: FileId,
        path: &Path,
        batch: &HashSet<PathBuf>,
        tx: &Sender<PipelineEvent>,
        cancel: &CancelToken,
    ) -> FileState {
        match catch_unwind(AssertUnwindSafe(|| self.process_file(id, path, batch, tx, cancel))) {
            Ok(state) => state,
            Err(panic_info) => {
                let reason = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!("Panic while processing {}: {}", path.display(), reason);
                emit(
                    tx,
                    cancel,
                    PipelineEvent::Failed {
                        file: id,
                        path: path.to_path_buf(),
                        error: IntakeError::Internal {
                            path: path.to_path_buf(),
                            reason,
                        },
                    },
                );
                FileState::Failed
            }
        }
    }

    /// Run one file through every stage and emit its terminal event
    ///
    /// `batch` holds every path submitted with this one; a file whose
    /// normalized output would land on one of them fails at the transcode
    /// stage. Returns the file's terminal state.
    pub fn process_file(
        &self,
        id: FileId,
        path: &Path,
        batch: &HashSet<PathBuf>,
        tx: &Sender<PipelineEvent>,
        cancel: &CancelToken,
    ) -> FileState {
        let mut file = AudioFileRef::new(path);

        let (next, event) = match self.run_stages(id, &mut file, batch, tx, cancel) {
            Ok(result) => {
                info!("Delivered {}", path.display());
                (
                    FileState::Delivered,
                    PipelineEvent::Delivered {
                        file: id,
                        result: Box::new(result),
                    },
                )
            }
            Err(IntakeError::Cancelled { .. }) => {
                debug!("Cancelled {}", path.display());
                (
                    FileState::Cancelled,
                    PipelineEvent::Cancelled {
                        file: id,
                        path: path.to_path_buf(),
                    },
                )
            }
            Err(error) => {
                if error.is_recoverable() {
                    warn!("Skipping {}: {}", path.display(), error);
                } else {
                    error!("Failed {}: {}", path.display(), error);
                }
                let next = if matches!(error, IntakeError::Validation { .. }) {
                    FileState::Rejected
                } else {
                    FileState::Failed
                };
                (
                    next,
                    PipelineEvent::Failed {
                        file: id,
                        path: path.to_path_buf(),
                        error,
                    },
                )
            }
        };

        if let Err(e) = file.advance(next) {
            error!("{} for {}", e, path.display());
        }
        emit(tx, cancel, event);
        next
    }

    fn run_stages(
        &self,
        id: FileId,
        file: &mut AudioFileRef,
        batch: &HashSet<PathBuf>,
        tx: &Sender<PipelineEvent>,
        cancel: &CancelToken,
    ) -> Result<IntakeResult> {
        let path = file.path.clone();
        let progress = |percent: u8, message: &str| {
            emit(
                tx,
                cancel,
                PipelineEvent::Progress {
                    file: id,
                    path: path.clone(),
                    progress: PipelineProgress::new(percent, message),
                },
            );
        };

        check_cancelled(cancel, &path)?;
        debug!("Validating {}", path.display());
        if let Validation::Rejected { reason } = self.validator.validate(&path) {
            return Err(IntakeError::validation_error(&path, reason));
        }
        file.advance(FileState::Validated)?;
        progress(PROGRESS_VALIDATED, "Validated");

        check_cancelled(cancel, &path)?;
        debug!("Reading metadata for {}", path.display());
        let metadata = self.extractor.extract(&path)?;
        file.advance(FileState::MetadataExtracted)?;
        progress(PROGRESS_METADATA, "Metadata extracted");

        check_cancelled(cancel, &path)?;
        debug!("Transcoding {} with {}", path.display(), self.transcoder.name());
        let target = self.transcoder.output_path(&path);
        if batch.contains(&target) {
            return Err(IntakeError::transcode_error(
                &path,
                format!(
                    "output {} is another file in this batch; refusing to overwrite it",
                    target.display()
                ),
            ));
        }
        let normalized = self.transcoder.transcode(&path)?;
        file.advance(FileState::Transcoded)?;
        progress(PROGRESS_TRANSCODED, "Transcoded");

        check_cancelled(cancel, &path)?;
        debug!("Loading {}", normalized.display());
        let waveform = self.loader.load(&normalized)?;
        file.advance(FileState::Loaded)?;
        progress(PROGRESS_LOADED, "Loaded");

        check_cancelled(cancel, &path)?;
        Ok(IntakeResult {
            source: path,
            normalized,
            metadata,
            waveform,
            loaded_at: chrono::Utc::now(),
        })
    }
}

fn check_cancelled(cancel: &CancelToken, path: &Path) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(IntakeError::Cancelled {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Send an event; a vanished receiver cancels the rest of the batch
fn emit(tx: &Sender<PipelineEvent>, cancel: &CancelToken, event: PipelineEvent) {
    if tx.send(event).is_err() && !cancel.is_cancelled() {
        debug!("Event receiver dropped, cancelling batch");
        cancel.cancel();
    }
}

/// Handle to a running batch
pub struct BatchHandle {
    events: Receiver<PipelineEvent>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl BatchHandle {
    /// Event stream; disconnects once the batch is finished
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    /// Ask the worker to stop; unfinished files end as `Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drain every remaining event and wait for the worker
    pub fn collect(mut self) -> Vec<PipelineEvent> {
        let events: Vec<PipelineEvent> = self.events.iter().collect();
        self.join();
        events
    }

    /// Drain every remaining event and return the batch summary
    pub fn wait(self) -> BatchSummary {
        let events = self.collect();
        let mut counted = BatchSummary::default();
        for event in &events {
            if let PipelineEvent::BatchFinished(summary) = event {
                return summary.clone();
            }
            counted.record_event(event);
        }
        counted
    }

    fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Intake worker thread panicked; some files may have no result");
            }
        }
    }
}

impl Drop for BatchHandle {
    fn drop(&mut self) {
        // Dropping the receiver right after this fails any pending send,
        // so the detached worker winds down on its own.
        if self.worker.is_some() {
            self.cancel.cancel();
        }
    }
}
