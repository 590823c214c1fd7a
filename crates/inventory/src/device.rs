// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Core data model: device identifiers, probe results and the enumeration
//! snapshot they come from.

use std::collections::BTreeMap;

use serde::Serialize;

/// Opaque name of a block device as seen by the operating system.
///
/// Raw devices use their kernel name (`sda`, `nvme0n1`); multipath devices
/// use their mapper name (`mpatha`). Identifiers sort lexicographically,
/// which is the stable order of the final inventory.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceIdentifier(String);

impl DeviceIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceIdentifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Everything a single probe learns about one device.
///
/// Created once per probe and immutable afterwards. Attributes that could
/// not be determined degrade to their absent form (`None`, `false`, empty
/// string) rather than failing the probe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawDeviceAttributes {
    /// Device size in bytes
    pub size: u64,
    /// Whether the device is rotational media
    pub rotational: bool,
    /// Model name; empty when the transport exposes none
    pub model: String,
    /// Kernel reports at least one partition on this device
    pub has_partitions: bool,
    /// A protective MBR (GPT marker) is present
    pub pmbr: bool,
    /// Recognized filesystem signature, if any
    pub filesystem: Option<String>,
    /// The device carries an LVM physical volume signature
    pub lvm_pv: bool,
    /// The device is held exclusively by another subsystem
    pub locked: bool,
    /// Underlying path identifiers; empty unless this is a multipath
    /// aggregate
    pub paths: Vec<DeviceIdentifier>,
}

/// Snapshot of the host's block layer taken at enumeration time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// Raw device identifiers, sorted and unique
    pub devices: Vec<DeviceIdentifier>,
    /// Multipath identifier to its ordered underlying path identifiers
    pub multipath: BTreeMap<DeviceIdentifier, Vec<DeviceIdentifier>>,
}

impl Enumeration {
    /// All identifiers the scan must probe: raw devices plus multipath
    /// aggregates. Each appears exactly once.
    pub fn identifiers(&self) -> Vec<DeviceIdentifier> {
        let mut ids = self.devices.clone();
        ids.extend(self.multipath.keys().cloned());
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.multipath.is_empty()
    }
}
