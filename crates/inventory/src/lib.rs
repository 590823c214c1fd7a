// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Parallel inventory of block storage devices.
//!
//! The pipeline enumerates raw and multipath devices, fans attribute
//! probes out across a bounded worker pool, folds multipath groups into
//! logical devices, applies the eligibility rules and returns an ordered
//! [`InventoryAggregate`]. Per-device failures become inventory rows with
//! a synthetic reject reason; only enumeration or policy failures abort a
//! run.
//!
//! Probing and enumeration sit behind capability traits so the pipeline
//! runs unchanged against the in-memory fakes in [`mock`].

use std::sync::Arc;

use log::info;

pub mod classify;
pub mod consolidate;
pub mod device;
pub mod errors;
pub mod mock;
pub mod policy;
pub mod probe;
pub mod record;
pub mod scan;

pub use classify::{classify, RejectReason};
pub use consolidate::{consolidate, ConsolidatedDevice};
pub use device::{DeviceIdentifier, Enumeration, RawDeviceAttributes};
pub use errors::{EnumerationError, InventoryError, PolicyError, ProbeFailure};
pub use policy::{human_readable_size, parse_size, Policy};
pub use probe::{AttributeProbe, DeviceEnumerator, SysfsEnumerator, SysfsProbe};
pub use record::{InventoryAggregate, InventoryRecord};

/// Runs a full inventory scan of the live host.
pub async fn run_inventory(policy: &Policy) -> Result<InventoryAggregate, InventoryError> {
    let enumerator = SysfsEnumerator::new();
    let probe = Arc::new(SysfsProbe::new());
    run_inventory_with(&enumerator, probe, policy).await
}

/// Runs the pipeline against injected enumeration and probe capabilities.
pub async fn run_inventory_with(
    enumerator: &dyn DeviceEnumerator,
    probe: Arc<dyn AttributeProbe>,
    policy: &Policy,
) -> Result<InventoryAggregate, InventoryError> {
    policy.validate()?;

    let enumeration = enumerator.enumerate()?;
    if enumeration.is_empty() {
        return Err(EnumerationError::NoDevices.into());
    }

    let identifiers = enumeration.identifiers();
    let limit = policy.effective_concurrency(identifiers.len());
    let deadline = policy.deadline.map(|d| tokio::time::Instant::now() + d);
    info!(
        "scanning {} identifiers with {limit} workers",
        identifiers.len()
    );

    let started = std::time::Instant::now();
    let results = scan::scan(probe, identifiers, limit, policy.probe_timeout, deadline).await;
    let devices = consolidate::consolidate(results, &enumeration.multipath);

    let records = devices
        .into_iter()
        .map(|device| {
            let reasons = classify::classify(&device, policy);
            InventoryRecord::from_classified(device, reasons)
        })
        .collect();
    let aggregate = InventoryAggregate::new(records);
    info!(
        "inventory complete: {} logical devices in {:?}",
        aggregate.len(),
        started.elapsed()
    );
    Ok(aggregate)
}
