//! Extension-based file validation
//!
//! Runs before any expensive work so obviously wrong inputs fail fast.
//! Only the path string is inspected; the file is never touched.

use crate::config::Settings;
use crate::types::AudioFormat;
use std::collections::BTreeSet;
use std::path::Path;

/// Outcome of validating one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Extension is accepted; the format is `None` for accepted extensions
    /// this crate has no dedicated variant for
    Accepted(Option<AudioFormat>),
    Rejected { reason: String },
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted(_))
    }
}

/// Accepts paths whose extension is in a configured set
#[derive(Debug, Clone)]
pub struct FileValidator {
    accepted: BTreeSet<String>,
}

impl FileValidator {
    /// `accepted` must already be lowercased
    pub fn new(accepted: BTreeSet<String>) -> Self {
        Self { accepted }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.accepted_extensions.clone())
    }

    pub fn validate(&self, path: &Path) -> Validation {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Validation::Rejected {
                reason: "missing file extension".to_string(),
            };
        };

        let ext = ext.to_lowercase();
        if self.accepted.contains(&ext) {
            Validation::Accepted(AudioFormat::from_extension(&ext))
        } else {
            Validation::Rejected {
                reason: format!("Unsupported file format: {ext}"),
            }
        }
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
