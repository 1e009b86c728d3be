// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ISO-8601 time-of-day duration parsing (`PTnHnMnS`).
//!
//! The catalogue expresses periodicity and retry intervals in the
//! `PTnHnMnS` subset of ISO-8601. Date components (years, months, days)
//! are not accepted.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("'{0}' does not match the ISO 8601 duration format [PTnHnMnS]")]
    Format(String),
}

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // the literal pattern is valid
        Regex::new(r"^PT(?:([0-9]+)H)?(?:([0-9]+)M)?(?:([0-9]+)S)?$").unwrap()
    })
}

/// Parse a `PTnHnMnS` duration string into a [`Duration`].
///
/// At least one of the hour/minute/second components must be present;
/// a bare `PT` is rejected.
pub fn parse_iso8601(input: &str) -> Result<Duration, DurationError> {
    let caps = pattern()
        .captures(input)
        .ok_or_else(|| DurationError::Format(input.to_string()))?;

    let component = |idx: usize| -> Result<u64, DurationError> {
        match caps.get(idx) {
            Some(m) => m
                .as_str()
                .parse::<u64>()
                .map_err(|_| DurationError::Format(input.to_string())),
            None => Ok(0),
        }
    };

    if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
        return Err(DurationError::Format(input.to_string()));
    }

    let secs = component(1)? * 60 * 60 + component(2)? * 60 + component(3)?;
    Ok(Duration::from_secs(secs))
}

/// Render a [`Duration`] in the same `PTnHnMnS` form the parser accepts.
///
/// Sub-second precision is dropped; a zero duration renders as `PT0S`.
pub fn format_iso8601(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 || (hours == 0 && minutes == 0) {
        out.push_str(&format!("{seconds}S"));
    }
    out
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
