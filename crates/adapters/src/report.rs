// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured error records for non-retriable failures.
//!
//! Each report is a JSON file in the reports directory; when the failing
//! command's output is worth keeping, it lands beside the record as a
//! capture file for first-failure debugging. Reporting is best-effort:
//! a reporter that cannot write only logs.

use chrono::Utc;
use rand::distr::{Alphanumeric, SampleString};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// One persisted error record.
#[derive(Debug, Serialize)]
struct ErrorRecord<'a> {
    #[serde(rename = "Kind")]
    kind: &'a str,
    #[serde(rename = "Message")]
    message: &'a str,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Details")]
    details: &'a BTreeMap<String, String>,
    #[serde(rename = "CaptureFile", skip_serializing_if = "Option::is_none")]
    capture_file: Option<String>,
}

/// Writes error records into a fixed directory.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    dir: PathBuf,
}

impl ErrorReporter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Record a failure, optionally with the captured command output.
    ///
    /// Returns the record path when one was written.
    pub fn report(
        &self,
        kind: &str,
        message: &str,
        details: BTreeMap<String, String>,
        capture: Option<&str>,
    ) -> Option<PathBuf> {
        error!(kind, message, ?details, "reporting failure");

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(error = %e, dir = %self.dir.display(), "cannot create report directory");
            return None;
        }

        let stem = format!("error_{}_{}", Utc::now().timestamp(), random_suffix());

        let capture_file = match capture {
            Some(text) if !text.is_empty() => {
                let path = self.dir.join(format!("{stem}.log"));
                match std::fs::write(&path, text) {
                    Ok(()) => Some(path.display().to_string()),
                    Err(e) => {
                        warn!(error = %e, "failed to write capture file");
                        None
                    }
                }
            }
            _ => None,
        };

        let record = ErrorRecord {
            kind,
            message,
            timestamp: Utc::now().to_rfc3339(),
            details: &details,
            capture_file,
        };

        let path = self.dir.join(format!("{stem}.json"));
        let body = match serde_json::to_string_pretty(&record) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to serialize error record");
                return None;
            }
        };
        match std::fs::write(&path, body) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to write error record");
                None
            }
        }
    }
}

/// Six random alphanumeric characters for unique report names.
pub(crate) fn random_suffix() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 6)
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
