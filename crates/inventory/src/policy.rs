// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Scan policy: eligibility thresholds and concurrency/timing knobs.
//!
//! Policy is passed explicitly into `run_inventory`; there is no ambient
//! global, so concurrent runs (and tests) cannot interfere with each
//! other.

use std::{num::NonZeroUsize, thread, time::Duration};

use crate::errors::PolicyError;

/// Devices below this size are rejected by default (10 GiB).
pub const DEFAULT_MIN_DEVICE_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Default bound on any single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Policy {
    /// Minimum eligible device size in bytes
    pub min_device_size: u64,
    /// Per-device probe timeout
    pub probe_timeout: Duration,
    /// Worker pool size; `None` selects min(CPU count, device count)
    pub concurrency: Option<usize>,
    /// Overall scan deadline, unbounded when `None`
    pub deadline: Option<Duration>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_device_size: DEFAULT_MIN_DEVICE_SIZE,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            concurrency: None,
            deadline: None,
        }
    }
}

impl Policy {
    /// Checked before any probing starts.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.concurrency == Some(0) {
            return Err(PolicyError::ZeroConcurrency);
        }
        Ok(())
    }

    /// Resolves the worker pool size for a scan of `device_count` devices.
    pub fn effective_concurrency(&self, device_count: usize) -> usize {
        match self.concurrency {
            Some(limit) => limit.max(1),
            None => {
                let cpus = thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(4);
                cpus.min(device_count).max(1)
            }
        }
    }
}

/// Parses a size threshold like `10G`, `512MB` or a plain byte count.
/// Suffixes are powers of 1024.
pub fn parse_size(input: &str) -> Result<u64, PolicyError> {
    let trimmed = input.trim().to_uppercase();
    let bad = || PolicyError::InvalidSize(input.to_string());
    if trimmed.is_empty() {
        return Err(bad());
    }

    // At most one trailing B: "10GB" is 10 GiB, "10BB" is garbage.
    let without_unit = trimmed.strip_suffix('B').unwrap_or(&trimmed);
    let (digits, multiplier) = match without_unit {
        rest if rest.ends_with('K') => (&rest[..rest.len() - 1], 1024u64),
        rest if rest.ends_with('M') => (&rest[..rest.len() - 1], 1024u64.pow(2)),
        rest if rest.ends_with('G') => (&rest[..rest.len() - 1], 1024u64.pow(3)),
        rest if rest.ends_with('T') => (&rest[..rest.len() - 1], 1024u64.pow(4)),
        rest => (rest, 1),
    };

    let value: f64 = digits.trim().parse().map_err(|_| bad())?;
    if !value.is_finite() || value < 0.0 {
        return Err(bad());
    }
    Ok((value * multiplier as f64).round() as u64)
}

/// Renders a byte count the way reports expect it, e.g. `10.00 GB`.
pub fn human_readable_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut index = 0;
    while size >= 1024.0 && index < SUFFIXES.len() - 1 {
        size /= 1024.0;
        index += 1;
    }
    format!("{size:.2} {}", SUFFIXES[index])
}
