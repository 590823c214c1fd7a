// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! In-memory probe and enumerator fakes for testing.
//!
//! These implement the same capability traits as the sysfs-backed
//! implementations, so the whole pipeline can run against synthetic hosts
//! without any hardware.

use std::{
    collections::BTreeMap,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    device::{DeviceIdentifier, Enumeration, RawDeviceAttributes},
    errors::{EnumerationError, ProbeFailure},
    probe::{AttributeProbe, DeviceEnumerator},
};

/// A clean baseline attribute set of the given size: non-rotational, no
/// signatures, unlocked, unpartitioned.
pub fn baseline_attributes(size: u64) -> RawDeviceAttributes {
    RawDeviceAttributes {
        size,
        rotational: false,
        model: "Mock Device".to_string(),
        has_partitions: false,
        pmbr: false,
        filesystem: None,
        lvm_pv: false,
        locked: false,
        paths: Vec::new(),
    }
}

/// Probe fake returning canned results, optionally after a delay.
#[derive(Default)]
pub struct MockProbe {
    results: BTreeMap<DeviceIdentifier, Result<RawDeviceAttributes, ProbeFailure>>,
    delays: BTreeMap<DeviceIdentifier, Duration>,
    default_delay: Option<Duration>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a successful probe result for `id`.
    pub fn attributes(mut self, id: impl Into<DeviceIdentifier>, attrs: RawDeviceAttributes) -> Self {
        self.results.insert(id.into(), Ok(attrs));
        self
    }

    /// Registers a probe failure for `id`.
    pub fn failure(mut self, id: impl Into<DeviceIdentifier>, failure: ProbeFailure) -> Self {
        self.results.insert(id.into(), Err(failure));
        self
    }

    /// Delays the probe of one device by `delay`.
    pub fn delay(mut self, id: impl Into<DeviceIdentifier>, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    /// Delays every probe by `delay` unless overridden per device.
    pub fn delay_all(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }
}

#[async_trait]
impl AttributeProbe for MockProbe {
    async fn probe(&self, id: &DeviceIdentifier) -> Result<RawDeviceAttributes, ProbeFailure> {
        let delay = self.delays.get(id).copied().or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.results
            .get(id)
            .cloned()
            .unwrap_or(Err(ProbeFailure::Disappeared))
    }
}

/// Enumerator fake handing out a fixed snapshot.
pub struct MockEnumerator(pub Enumeration);

impl MockEnumerator {
    /// Convenience constructor from raw names and (multipath, paths) pairs.
    pub fn from_names(devices: &[&str], multipath: &[(&str, &[&str])]) -> Self {
        let devices = devices.iter().map(|d| DeviceIdentifier::from(*d)).collect();
        let multipath = multipath
            .iter()
            .map(|(name, paths)| {
                let paths = paths.iter().map(|p| DeviceIdentifier::from(*p)).collect();
                (DeviceIdentifier::from(*name), paths)
            })
            .collect();
        Self(Enumeration { devices, multipath })
    }
}

impl DeviceEnumerator for MockEnumerator {
    fn enumerate(&self) -> Result<Enumeration, EnumerationError> {
        if self.0.is_empty() {
            return Err(EnumerationError::NoDevices);
        }
        Ok(self.0.clone())
    }
}
