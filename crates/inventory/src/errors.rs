// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Error taxonomy for the inventory pipeline.
//!
//! Only enumeration and policy problems abort a run. Anything that goes
//! wrong with a single device is captured as a [`ProbeFailure`] and still
//! produces an inventory row.

use std::io;

use thiserror::Error;

/// Fatal: the device listing mechanism is unusable, or found nothing.
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The sysfs block listing could not be read at all
    #[error("device listing unreachable: {0}")]
    Unreachable(#[from] io::Error),

    /// Zero identifiers discovered; an empty scan has no meaning
    #[error("no block devices discovered")]
    NoDevices,
}

/// Non-fatal, per-device: why one probe produced no attributes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProbeFailure {
    /// I/O error while querying the device
    #[error("I/O failure: {0}")]
    Io(String),

    /// Single-probe timeout expired
    #[error("timeout")]
    Timeout,

    /// The overall scan deadline expired before this probe completed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The device vanished between enumeration and probing
    #[error("device disappeared")]
    Disappeared,
}

/// Fatal at startup: the scan policy itself is unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The minimum-size threshold could not be parsed
    #[error("unparsable size threshold: {0:?}")]
    InvalidSize(String),

    /// A concurrency limit of zero can never make progress
    #[error("concurrency limit must be greater than zero")]
    ZeroConcurrency,
}

/// Umbrella error surfaced by `run_inventory`.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}
