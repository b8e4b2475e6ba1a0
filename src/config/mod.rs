//! Configuration, CLI handling and persisted preferences

pub mod cli;
pub mod preferences;
pub mod settings;

pub use cli::Cli;
pub use preferences::PreferenceStore;
pub use settings::{Settings, TranscoderKind};
