// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pairsync-catalog: loads the replication catalogue.
//!
//! The catalogue is a directory of JSON files, each contributing `Files`
//! and `Directories` arrays. Files that fail to parse are logged and
//! skipped; the rest of the catalogue still loads.

mod raw;

use pairsync_core::SyncEntry;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The loaded catalogue: deduplicated entries in file order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Catalog {
    pub entries: Vec<SyncEntry>,
    /// Number of catalogue files that failed to parse and were skipped.
    pub file_errors: usize,
}

/// Load every regular file under `dir` as a catalogue fragment.
///
/// A missing directory is an empty catalogue. Entries are deduplicated by
/// path; the first occurrence wins.
pub fn load_dir(dir: &Path) -> Catalog {
    let mut entries: IndexMap<PathBuf, SyncEntry> = IndexMap::new();
    let mut file_errors = 0;

    let Ok(listing) = std::fs::read_dir(dir) else {
        warn!(dir = %dir.display(), "catalogue directory not readable, starting empty");
        return Catalog::default();
    };

    let mut files: Vec<PathBuf> = listing
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    for file in files {
        match load_file(&file) {
            Ok(parsed) => {
                for entry in parsed {
                    if entries.contains_key(&entry.path) {
                        warn!(
                            path = %entry.path.display(),
                            file = %file.display(),
                            "duplicate catalogue entry ignored"
                        );
                        continue;
                    }
                    entries.insert(entry.path.clone(), entry);
                }
            }
            Err(e) => {
                error!(error = %e, "failed to parse catalogue file, skipping");
                file_errors += 1;
            }
        }
    }

    Catalog {
        entries: entries.into_values().collect(),
        file_errors,
    }
}

/// Parse a single catalogue file into entries.
pub fn load_file(path: &Path) -> Result<Vec<SyncEntry>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: raw::CatalogFile =
        serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut entries = Vec::with_capacity(file.files.len() + file.directories.len());
    entries.extend(file.files.into_iter().map(|raw| raw.into_entry(false)));
    entries.extend(file.directories.into_iter().map(|raw| raw.into_entry(true)));
    Ok(entries)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
