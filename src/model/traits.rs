//! Model backend abstraction

use crate::error::Result;
use ndarray::{Array2, ArrayView2};
use std::path::Path;

/// Loads named models and runs inference with them
pub trait ModelBackend: Send + Sync + 'static {
    /// A loaded, ready-to-run model
    type Model: Send + 'static;

    /// Names accepted by [`ModelBackend::load`]
    fn available_models(&self) -> Vec<&'static str>;

    /// Build a registered model by name
    fn load(&self, name: &str) -> Result<Self::Model>;

    /// Load model parameters from a checkpoint file
    fn load_checkpoint(&self, path: &Path) -> Result<Self::Model>;

    /// Run the model over a batch of rows
    fn infer(&self, model: &Self::Model, input: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Get the name of this backend (for logging)
    fn name(&self) -> &'static str;
}
