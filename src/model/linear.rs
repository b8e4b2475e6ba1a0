//! Linear-layer stub backend

use super::traits::ModelBackend;
use crate::error::{IntakeError, Result};
use crate::types::Waveform;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Width of every input row
pub const INPUT_FEATURES: usize = 10;

const REGISTERED: [&str; 3] = ["ModelA", "ModelB", "ModelC"];

/// A single `INPUT_FEATURES -> 1` linear layer
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub name: String,
    weights: Array1<f32>,
    bias: f32,
}

impl LinearModel {
    pub fn weights(&self) -> &Array1<f32> {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }
}

/// On-disk checkpoint layout
#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    name: Option<String>,
    weights: Vec<f32>,
    bias: f32,
}

/// Backend serving the registered linear models
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearBackend;

impl LinearBackend {
    pub fn new() -> Self {
        Self
    }

    /// Summarize a waveform as one row of per-segment RMS levels
    pub fn features(waveform: &Waveform) -> Array2<f32> {
        let mono = waveform.to_mono();
        let mut row = Array2::<f32>::zeros((1, INPUT_FEATURES));
        if mono.is_empty() {
            return row;
        }

        let segment = mono.len().div_ceil(INPUT_FEATURES);
        for (i, chunk) in mono.chunks(segment).enumerate().take(INPUT_FEATURES) {
            let energy: f32 = chunk.iter().map(|s| s * s).sum();
            row[[0, i]] = (energy / chunk.len() as f32).sqrt();
        }
        row
    }
}

impl ModelBackend for LinearBackend {
    type Model = LinearModel;

    fn available_models(&self) -> Vec<&'static str> {
        REGISTERED.to_vec()
    }

    fn load(&self, name: &str) -> Result<LinearModel> {
        let index = REGISTERED
            .iter()
            .position(|&n| n == name)
            .ok_or_else(|| IntakeError::ModelUnavailable {
                name: name.to_string(),
            })?;

        // Fixed parameters per registry slot
        let weights = Array1::from_iter(
            (0..INPUT_FEATURES).map(|i| (i + 1 + index) as f32 / (INPUT_FEATURES * 10) as f32),
        );
        debug!("Built {} with {} weights", name, weights.len());

        Ok(LinearModel {
            name: name.to_string(),
            weights,
            bias: index as f32 * 0.01,
        })
    }

    fn load_checkpoint(&self, path: &Path) -> Result<LinearModel> {
        let unavailable = |reason: String| IntakeError::ModelUnavailable {
            name: format!("{} ({})", path.display(), reason),
        };

        let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
        let checkpoint: Checkpoint =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| unavailable(e.to_string()))?;

        if checkpoint.weights.len() != INPUT_FEATURES {
            return Err(unavailable(format!(
                "expected {} weights, found {}",
                INPUT_FEATURES,
                checkpoint.weights.len()
            )));
        }

        let name = checkpoint.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "checkpoint".to_string())
        });

        Ok(LinearModel {
            name,
            weights: Array1::from(checkpoint.weights),
            bias: checkpoint.bias,
        })
    }

    fn infer(&self, model: &LinearModel, input: ArrayView2<f32>) -> Result<Array2<f32>> {
        if input.ncols() != INPUT_FEATURES {
            return Err(IntakeError::Inference {
                reason: format!(
                    "{} expects {} features per row, got {}",
                    model.name,
                    INPUT_FEATURES,
                    input.ncols()
                ),
            });
        }

        let out = input.dot(&model.weights) + model.bias;
        Ok(out.insert_axis(Axis(1)))
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_registry_names() {
        assert_eq!(
            LinearBackend::new().available_models(),
            vec!["ModelA", "ModelB", "ModelC"]
        );
    }

    #[test]
    fn test_unknown_model_is_unavailable() {
        let err = LinearBackend::new().load("ModelZ").unwrap_err();
        assert!(matches!(err, IntakeError::ModelUnavailable { ref name } if name == "ModelZ"));
    }

    #[test]
    fn test_infer_shape_and_determinism() {
        let backend = LinearBackend::new();
        let model = backend.load("ModelA").unwrap();
        let input = Array2::<f32>::ones((3, INPUT_FEATURES));

        let a = backend.infer(&model, input.view()).unwrap();
        let b = backend.infer(&model, input.view()).unwrap();
        assert_eq!(a.shape(), &[3, 1]);
        assert_eq!(a, b);
        // ModelA: weights 1..=10 over 100, no bias
        assert!((a[[0, 0]] - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_infer_rejects_wrong_width() {
        let backend = LinearBackend::new();
        let model = backend.load("ModelB").unwrap();
        let err = backend.infer(&model, array![[1.0f32, 2.0]].view()).unwrap_err();
        assert!(matches!(err, IntakeError::Inference { .. }));
    }

    #[test]
    fn test_load_checkpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.json");
        std::fs::write(&path, r#"{"weights":[1,0,0,0,0,0,0,0,0,0],"bias":0.5}"#).unwrap();

        let backend = LinearBackend::new();
        let model = backend.load_checkpoint(&path).unwrap();
        assert_eq!(model.name, "tiny");
        let mut input = Array2::<f32>::zeros((1, INPUT_FEATURES));
        input[[0, 0]] = 2.0;
        assert_eq!(backend.infer(&model, input.view()).unwrap()[[0, 0]], 2.5);

        std::fs::write(&path, r#"{"weights":[1],"bias":0}"#).unwrap();
        assert!(backend.load_checkpoint(&path).is_err());
    }

    #[test]
    fn test_features_from_waveform() {
        let w = Waveform::new(vec![0.5; 100], 100, 1).unwrap();
        let f = LinearBackend::features(&w);
        assert_eq!(f.shape(), &[1, INPUT_FEATURES]);
        assert!(f.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }
}
