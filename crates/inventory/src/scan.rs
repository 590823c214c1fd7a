// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Concurrent probe fan-out.
//!
//! Each identifier becomes an independent task gated by a semaphore, so
//! one slow or locked device never delays the others and total wall-clock
//! time is bounded by ceil(devices / pool size) × the slowest probe.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use log::{debug, error, warn};
use tokio::{
    sync::Semaphore,
    task::JoinSet,
    time::{self, Instant},
};

use crate::{
    device::{DeviceIdentifier, RawDeviceAttributes},
    errors::ProbeFailure,
    probe::AttributeProbe,
};

/// Per-device probe outcome.
pub type ScanResults = BTreeMap<DeviceIdentifier, Result<RawDeviceAttributes, ProbeFailure>>;

/// Probes every identifier with bounded concurrency and returns exactly
/// one outcome per identifier.
///
/// The per-device `probe_timeout` starts once a worker slot is acquired.
/// When `deadline` expires, outstanding tasks are abandoned and every
/// identifier still pending is recorded as `ProbeFailure::DeadlineExceeded`.
pub async fn scan(
    probe: Arc<dyn AttributeProbe>,
    identifiers: Vec<DeviceIdentifier>,
    limit: usize,
    probe_timeout: Duration,
    deadline: Option<Instant>,
) -> ScanResults {
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for id in identifiers.iter().cloned() {
        let probe = Arc::clone(&probe);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // The semaphore is never closed while tasks run
            let _permit = semaphore.acquire_owned().await;
            let started = Instant::now();
            let outcome = match time::timeout(probe_timeout, probe.probe(&id)).await {
                Ok(result) => result,
                Err(_) => Err(ProbeFailure::Timeout),
            };
            let elapsed = started.elapsed();
            match &outcome {
                Ok(_) => debug!("probe complete: device={id} duration={elapsed:?} outcome=ok"),
                Err(cause) => {
                    warn!("probe complete: device={id} duration={elapsed:?} outcome={cause}")
                }
            }
            (id, outcome)
        });
    }

    let mut results = ScanResults::new();
    let mut pending: BTreeSet<DeviceIdentifier> = identifiers.into_iter().collect();
    let mut expired = false;

    while !tasks.is_empty() {
        let joined = match deadline {
            Some(deadline) => match time::timeout_at(deadline, tasks.join_next()).await {
                Ok(joined) => joined,
                Err(_) => {
                    expired = true;
                    break;
                }
            },
            None => tasks.join_next().await,
        };
        match joined {
            Some(Ok((id, outcome))) => {
                pending.remove(&id);
                results.insert(id, outcome);
            }
            Some(Err(err)) => error!("probe task failed to join: {err}"),
            None => break,
        }
    }
    tasks.abort_all();

    // Completeness guarantee: one row per requested identifier, whatever
    // happened to its task.
    for id in pending {
        let cause = if expired {
            ProbeFailure::DeadlineExceeded
        } else {
            ProbeFailure::Io("probe task failed".to_string())
        };
        results.entry(id).or_insert(Err(cause));
    }
    results
}
