// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Enumeration of Linux block devices and per-device sysfs attribute reads.
//!
//! Everything in here takes an explicit `sysroot` so tests can point the
//! crate at a synthetic tree instead of the live `/sys` and `/dev`.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub mod dm;
pub mod lock;
mod sysfs;

const BLOCK_DIR: &str = "sys/block";
const DEV_DIR: &str = "dev";

/// Device name prefixes that are never inventory candidates: loopback,
/// ramdisks, device-mapper nodes (reached through the multipath map
/// instead), md arrays and optical drives.
const EXCLUDED_PREFIXES: &[&str] = &["loop", "ram", "zram", "dm-", "md", "sr", "nbd"];

/// Default system root for live scans.
pub const DEFAULT_SYSROOT: &str = "/";

/// Lists the names of raw block devices present under `<sysroot>/sys/block`,
/// sorted, with excluded prefixes filtered out.
pub fn list_block_devices(sysroot: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(sysroot.join(BLOCK_DIR))?
        .filter_map(Result::ok)
        .filter_map(|e| Some(e.file_name().to_str()?.to_owned()))
        .filter(|name| !EXCLUDED_PREFIXES.iter().any(|p| name.starts_with(p)))
        .collect();
    names.sort();
    log::debug!("{} block devices detected", names.len());
    Ok(names)
}

/// Sysfs view of a single block device.
#[derive(Clone, Debug)]
pub struct BlockDisk {
    /// Device name (e.g. sda, nvme0n1, dm-0)
    pub name: String,
    /// Total number of sectors reported by the kernel
    pub sectors: u64,
    /// Logical block size in bytes
    pub logical_block_size: u64,
    /// Whether the device reports itself as rotational media
    pub rotational: bool,
    /// Model name, when the transport exposes one
    pub model: Option<String>,
    /// Number of partitions the kernel currently knows about
    pub partition_count: usize,
    /// Path to the device node in `<sysroot>/dev`
    pub device: PathBuf,
}

impl BlockDisk {
    /// Reads a device's attributes from its sysfs directory.
    ///
    /// Returns `None` when the device directory does not exist, which is how
    /// a device that disappeared mid-scan presents itself. Individual
    /// missing attributes degrade to defaults instead.
    pub fn from_sysfs_path(sysroot: &Path, name: &str) -> Option<Self> {
        let node = sysroot.join(BLOCK_DIR).join(name);
        if !node.is_dir() {
            return None;
        }

        // Partitions appear as subdirectories named after the parent device
        // (sda1, nvme0n1p2, ...).
        let partition_count = fs::read_dir(&node)
            .ok()?
            .filter_map(Result::ok)
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n.starts_with(name) && n != name)
                    .unwrap_or(false)
            })
            .count();

        Some(Self {
            name: name.to_owned(),
            sectors: sysfs::read(&node, "size").unwrap_or(0),
            logical_block_size: sysfs::read(&node, "queue/logical_block_size").unwrap_or(512),
            rotational: sysfs::read::<u8>(&node, "queue/rotational").unwrap_or(0) == 1,
            model: sysfs::read(&node, "device/model"),
            partition_count,
            device: sysroot.join(DEV_DIR).join(name),
        })
    }

    /// Returns the size of the device in bytes.
    pub fn size_in_bytes(&self) -> u64 {
        self.sectors * self.logical_block_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    pub(crate) fn write_attr(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_list_excludes_prefixes() {
        let root = tempfile::tempdir().unwrap();
        for dev in ["sda", "sdb", "loop0", "dm-0", "ram1", "sr0"] {
            fs::create_dir_all(root.path().join(BLOCK_DIR).join(dev)).unwrap();
        }

        let devices = list_block_devices(root.path()).unwrap();
        assert_eq!(devices, vec!["sda".to_string(), "sdb".to_string()]);
    }

    #[test]
    fn test_list_unreachable() {
        let root = tempfile::tempdir().unwrap();
        // No sys/block directory at all
        assert!(list_block_devices(root.path()).is_err());
    }

    #[test]
    fn test_disk_attributes() {
        let root = tempfile::tempdir().unwrap();
        let base = format!("{BLOCK_DIR}/sda");
        write_attr(root.path(), &format!("{base}/size"), "29296875\n");
        write_attr(root.path(), &format!("{base}/queue/rotational"), "1\n");
        write_attr(root.path(), &format!("{base}/queue/logical_block_size"), "512\n");
        write_attr(root.path(), &format!("{base}/device/model"), "QEMU HARDDISK\n");
        fs::create_dir_all(root.path().join(&base).join("sda1")).unwrap();

        let disk = BlockDisk::from_sysfs_path(root.path(), "sda").unwrap();
        assert_eq!(disk.size_in_bytes(), 29_296_875 * 512);
        assert!(disk.rotational);
        assert_eq!(disk.model.as_deref(), Some("QEMU HARDDISK"));
        assert_eq!(disk.partition_count, 1);
    }

    #[test]
    fn test_disk_missing() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(BLOCK_DIR)).unwrap();
        assert!(BlockDisk::from_sysfs_path(root.path(), "sdz").is_none());
    }

    #[test]
    fn test_disk_degrades_missing_attributes() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(BLOCK_DIR).join("sdb")).unwrap();

        let disk = BlockDisk::from_sysfs_path(root.path(), "sdb").unwrap();
        assert_eq!(disk.sectors, 0);
        assert_eq!(disk.logical_block_size, 512);
        assert!(!disk.rotational);
        assert!(disk.model.is_none());
    }
}
