// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Probe and enumeration capabilities.
//!
//! The core only depends on these traits; the sysfs-backed implementations
//! below are what a live scan uses, and `crate::mock` provides in-memory
//! fakes for tests.

use std::{
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::{debug, warn};

use crate::{
    device::{DeviceIdentifier, Enumeration, RawDeviceAttributes},
    errors::{EnumerationError, ProbeFailure},
};

/// Lists the block devices and multipath topology of the host.
pub trait DeviceEnumerator: Send + Sync {
    fn enumerate(&self) -> Result<Enumeration, EnumerationError>;
}

/// Queries all attributes of one device needed for classification.
///
/// Implementations must not share mutable state between probes of
/// different identifiers; that independence is what makes the concurrent
/// fan-out safe.
#[async_trait]
pub trait AttributeProbe: Send + Sync {
    async fn probe(&self, id: &DeviceIdentifier) -> Result<RawDeviceAttributes, ProbeFailure>;
}

/// Live enumerator reading `<sysroot>/sys/block` and `<sysroot>/dev/mapper`.
pub struct SysfsEnumerator {
    sysroot: PathBuf,
}

impl SysfsEnumerator {
    pub fn new() -> Self {
        Self::with_sysroot(blockdev::DEFAULT_SYSROOT)
    }

    pub fn with_sysroot(sysroot: impl Into<PathBuf>) -> Self {
        Self {
            sysroot: sysroot.into(),
        }
    }
}

impl Default for SysfsEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for SysfsEnumerator {
    fn enumerate(&self) -> Result<Enumeration, EnumerationError> {
        let devices = blockdev::list_block_devices(&self.sysroot)?
            .into_iter()
            .map(DeviceIdentifier::new)
            .collect::<Vec<_>>();

        let multipath = blockdev::dm::multipath_groups(&self.sysroot)?
            .into_iter()
            .map(|group| {
                let paths = group.paths.into_iter().map(DeviceIdentifier::new).collect();
                (DeviceIdentifier::new(group.name), paths)
            })
            .collect();

        let enumeration = Enumeration { devices, multipath };
        if enumeration.is_empty() {
            return Err(EnumerationError::NoDevices);
        }
        Ok(enumeration)
    }
}

/// Live probe combining sysfs attribute reads with on-disk signature
/// inspection.
pub struct SysfsProbe {
    sysroot: PathBuf,
}

impl SysfsProbe {
    pub fn new() -> Self {
        Self::with_sysroot(blockdev::DEFAULT_SYSROOT)
    }

    pub fn with_sysroot(sysroot: impl Into<PathBuf>) -> Self {
        Self {
            sysroot: sysroot.into(),
        }
    }
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttributeProbe for SysfsProbe {
    async fn probe(&self, id: &DeviceIdentifier) -> Result<RawDeviceAttributes, ProbeFailure> {
        let sysroot = self.sysroot.clone();
        let id = id.clone();
        // All queries are blocking filesystem I/O; run them off the async
        // workers so a timeout can abandon the task cleanly.
        tokio::task::spawn_blocking(move || probe_blocking(&sysroot, &id))
            .await
            .map_err(|e| ProbeFailure::Io(e.to_string()))?
    }
}

/// Resolves an identifier to the sysfs node carrying its attributes.
///
/// Raw devices are their own node; multipath identifiers resolve through
/// the mapper symlink to a `dm-N` node and pick up their underlying paths.
fn resolve_node(
    sysroot: &Path,
    id: &DeviceIdentifier,
) -> Result<(String, Vec<DeviceIdentifier>), ProbeFailure> {
    if blockdev::BlockDisk::from_sysfs_path(sysroot, id.as_str()).is_some() {
        return Ok((id.as_str().to_owned(), Vec::new()));
    }
    let node = blockdev::dm::resolve_mapper(sysroot, id.as_str()).ok_or(ProbeFailure::Disappeared)?;
    let paths = blockdev::dm::slaves(sysroot, &node)
        .unwrap_or_default()
        .into_iter()
        .map(DeviceIdentifier::new)
        .collect();
    Ok((node, paths))
}

fn probe_blocking(
    sysroot: &Path,
    id: &DeviceIdentifier,
) -> Result<RawDeviceAttributes, ProbeFailure> {
    let (node, paths) = resolve_node(sysroot, id)?;
    let disk =
        blockdev::BlockDisk::from_sysfs_path(sysroot, &node).ok_or(ProbeFailure::Disappeared)?;

    // Signature inspection needs the device node itself. Failure here
    // degrades to "no signature seen" rather than failing the probe.
    let signatures = match fs::File::open(&disk.device) {
        Ok(mut file) => inspect_signatures(&mut file, id),
        Err(err) => {
            debug!("cannot open {} for signature inspection: {err}", disk.device.display());
            SignatureReport::default()
        }
    };

    let locked = disk.device.exists() && blockdev::lock::is_locked(&disk.device);

    Ok(RawDeviceAttributes {
        size: disk.size_in_bytes(),
        rotational: disk.rotational,
        model: disk.model.unwrap_or_default().trim().to_owned(),
        // The kernel view and the on-disk table corroborate each other: a
        // table written since the last rescan still counts.
        has_partitions: disk.partition_count > 0 || signatures.table_partitions > 0,
        pmbr: signatures.pmbr,
        filesystem: signatures.filesystem,
        lvm_pv: signatures.lvm_pv,
        locked,
        paths,
    })
}

/// What the on-disk signature sweep saw. Protective MBRs are reported as
/// `pmbr` only; their single 0xEE entry is not a partition.
#[derive(Default)]
struct SignatureReport {
    pmbr: bool,
    table_partitions: usize,
    filesystem: Option<String>,
    lvm_pv: bool,
}

fn inspect_signatures(file: &mut fs::File, id: &DeviceIdentifier) -> SignatureReport {
    let mut report = SignatureReport::default();
    match signatures::mbr::Mbr::read_from(file) {
        Ok(Some(mbr)) if mbr.is_protective() => report.pmbr = true,
        Ok(Some(mbr)) => report.table_partitions = mbr.partition_count(),
        Ok(None) => {}
        Err(err) => warn!("MBR inspection of {id} failed: {err}"),
    }
    report.filesystem = match signatures::detect_filesystem(file) {
        Ok(kind) => kind.map(|k| k.to_string()),
        Err(err) => {
            warn!("filesystem signature sweep of {id} failed: {err}");
            None
        }
    };
    report.lvm_pv = match signatures::has_lvm_label(file) {
        Ok(found) => found,
        Err(err) => {
            warn!("LVM label check of {id} failed: {err}");
            false
        }
    };
    report
}
