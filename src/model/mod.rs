//! Placeholder model subsystem
//!
//! A registry of named models behind [`ModelBackend`], driven from a worker
//! thread by [`ModelManager`]. The only backend is a small linear layer; it
//! stands in for a real separation network.

pub mod linear;
pub mod manager;
pub mod traits;

pub use linear::{LinearBackend, LinearModel, INPUT_FEATURES};
pub use manager::{ModelEvent, ModelManager, RequestId};
pub use traits::ModelBackend;
