//! Running model operations off the caller's thread
//!
//! Requests are queued to a single worker which owns the current model.
//! Every request produces exactly one [`ModelEvent`], tagged with the
//! [`RequestId`] returned when it was queued.

use super::traits::ModelBackend;
use crate::error::{IntakeError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use ndarray::Array2;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Identifies one queued request
pub type RequestId = u64;

/// Outcome of one queued model request
#[derive(Debug)]
pub enum ModelEvent {
    Loaded {
        request: RequestId,
        name: String,
    },
    InferenceFinished {
        request: RequestId,
        model: String,
        output: Array2<f32>,
    },
    Error {
        request: RequestId,
        error: IntakeError,
    },
}

impl ModelEvent {
    pub fn request(&self) -> RequestId {
        match self {
            ModelEvent::Loaded { request, .. }
            | ModelEvent::InferenceFinished { request, .. }
            | ModelEvent::Error { request, .. } => *request,
        }
    }
}

enum Command {
    Build(String),
    LoadCheckpoint(PathBuf),
    Run(Array2<f32>),
}

/// Owns a model worker thread
pub struct ModelManager {
    available: Vec<&'static str>,
    requests: Option<Sender<(RequestId, Command)>>,
    next_request: AtomicU64,
    events: Receiver<ModelEvent>,
    worker: Option<JoinHandle<()>>,
}

impl ModelManager {
    pub fn new<B: ModelBackend>(backend: B) -> Result<Self> {
        let available = backend.available_models();
        let (req_tx, req_rx) = unbounded::<(RequestId, Command)>();
        let (event_tx, event_rx) = unbounded();

        let worker = std::thread::Builder::new()
            .name("model-worker".to_string())
            .spawn(move || serve(backend, req_rx, event_tx))?;

        Ok(Self {
            available,
            requests: Some(req_tx),
            next_request: AtomicU64::new(0),
            events: event_rx,
            worker: Some(worker),
        })
    }

    pub fn available_models(&self) -> &[&'static str] {
        &self.available
    }

    pub fn events(&self) -> &Receiver<ModelEvent> {
        &self.events
    }

    /// Queue building a registered model; replaces the current one on success
    pub fn build_model(&self, name: &str) -> Result<RequestId> {
        self.send(Command::Build(name.to_string()))
    }

    pub fn load_checkpoint(&self, path: impl Into<PathBuf>) -> Result<RequestId> {
        self.send(Command::LoadCheckpoint(path.into()))
    }

    /// Queue inference on the current model
    pub fn run_model(&self, input: Array2<f32>) -> Result<RequestId> {
        self.send(Command::Run(input))
    }

    /// Wait for the event answering `request`, dropping older ones
    pub fn wait_for(&self, request: RequestId, timeout: Duration) -> Result<ModelEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self
                .events
                .recv_timeout(remaining)
                .map_err(|e| IntakeError::Inference {
                    reason: format!("no answer to model request {request}: {e}"),
                })?;
            if event.request() == request {
                return Ok(event);
            }
            debug!("Dropping stale answer to model request {}", event.request());
        }
    }

    fn send(&self, command: Command) -> Result<RequestId> {
        let id = self.next_request.fetch_add(1, Ordering::Relaxed);
        self.requests
            .as_ref()
            .and_then(|tx| tx.send((id, command)).ok())
            .map(|_| id)
            .ok_or_else(|| IntakeError::Inference {
                reason: "model worker has stopped".to_string(),
            })
    }
}

impl Drop for ModelManager {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Model worker panicked");
            }
        }
    }
}

fn serve<B: ModelBackend>(
    backend: B,
    requests: Receiver<(RequestId, Command)>,
    events: Sender<ModelEvent>,
) {
    let mut current: Option<(String, B::Model)> = None;

    for (request, command) in requests {
        let event = match command {
            Command::Build(name) => match backend.load(&name) {
                Ok(model) => {
                    current = Some((name.clone(), model));
                    ModelEvent::Loaded { request, name }
                }
                Err(error) => ModelEvent::Error { request, error },
            },
            Command::LoadCheckpoint(path) => match backend.load_checkpoint(&path) {
                Ok(model) => {
                    let name = path.display().to_string();
                    current = Some((name.clone(), model));
                    ModelEvent::Loaded { request, name }
                }
                Err(error) => ModelEvent::Error { request, error },
            },
            Command::Run(input) => match &current {
                None => ModelEvent::Error {
                    request,
                    error: IntakeError::Inference {
                        reason: "No model loaded".to_string(),
                    },
                },
                Some((name, model)) => match backend.infer(model, input.view()) {
                    Ok(output) => ModelEvent::InferenceFinished {
                        request,
                        model: name.clone(),
                        output,
                    },
                    Err(error) => ModelEvent::Error { request, error },
                },
            },
        };

        if events.send(event).is_err() {
            break;
        }
    }
    debug!("Model worker ({}) stopped", backend.name());
}
