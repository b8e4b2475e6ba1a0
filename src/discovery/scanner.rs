//! Expansion of dropped paths into the files to ingest

use crate::audio::is_normalized_output;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Expand directories into the files they contain
///
/// Plain file paths are passed through unchanged (including unsupported or
/// missing ones) so the validator can report them. Directory entries are
/// sorted by name for a stable batch order, and files written by an earlier
/// run (`*.normalized.wav`) are skipped.
pub fn expand_inputs(inputs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let found = scan_directory(input, recursive);
            if found.is_empty() {
                warn!("No files found in {}", input.display());
            }
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }

    info!("Collected {} input files", files.len());
    files
}

fn scan_directory(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    walker
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let output = is_normalized_output(e.path());
            if output {
                debug!("Skipping earlier output: {}", e.path().display());
            }
            !output
        })
        .map(|e| {
            debug!("Discovered: {}", e.path().display());
            e.into_path()
        })
        .collect()
}
