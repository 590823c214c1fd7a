// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! On-disk signature detection for block devices.
//!
//! This crate answers three read-only questions about a device: does it
//! carry a known filesystem superblock, does it carry an LVM physical
//! volume label, and what does its MBR (if any) look like. All probes work
//! on magic bytes at fixed offsets; nothing here interprets the structures
//! beyond identification.

use std::io::{self, Read, Seek};

use log::debug;
use thiserror::Error;

pub mod mbr;

/// Errors that can occur while inspecting signatures
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred
    #[error("io: {0}")]
    IO(#[from] io::Error),
}

/// Filesystem (or container) types recognized by the magic sweep
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Btrfs filesystem
    Btrfs,
    /// Ext2/3/4 family (shared magic, reported as ext4)
    Ext4,
    /// F2FS (Flash-Friendly File System)
    F2fs,
    /// LUKS encrypted container
    Luks,
    /// Linux swap area
    Swap,
    /// XFS filesystem
    Xfs,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Btrfs => f.write_str("btrfs"),
            Kind::Ext4 => f.write_str("ext4"),
            Kind::F2fs => f.write_str("f2fs"),
            Kind::Luks => f.write_str("crypto_LUKS"),
            Kind::Swap => f.write_str("swap"),
            Kind::Xfs => f.write_str("xfs"),
        }
    }
}

/// One magic-at-offset test
struct SignatureTest {
    kind: Kind,
    offset: u64,
    magic: &'static [u8],
}

/// Magic table, checked in order. Offsets are absolute from the start of
/// the device.
const SIGNATURE_TESTS: &[SignatureTest] = &[
    SignatureTest {
        kind: Kind::Xfs,
        offset: 0,
        magic: b"XFSB",
    },
    SignatureTest {
        kind: Kind::Luks,
        offset: 0,
        magic: b"LUKS\xba\xbe",
    },
    SignatureTest {
        kind: Kind::Ext4,
        offset: 0x438,
        magic: &[0x53, 0xEF],
    },
    SignatureTest {
        kind: Kind::F2fs,
        offset: 0x400,
        magic: &[0x10, 0x20, 0xF5, 0xF2],
    },
    SignatureTest {
        kind: Kind::Btrfs,
        offset: 0x10040,
        magic: b"_BHRfS_M",
    },
    // Swap signature sits at the end of the first page
    SignatureTest {
        kind: Kind::Swap,
        offset: 4096 - 10,
        magic: b"SWAPSPACE2",
    },
    SignatureTest {
        kind: Kind::Swap,
        offset: 4096 - 10,
        magic: b"SWAP-SPACE",
    },
];

/// LVM physical volume labels carry this marker in one of the first four
/// sectors.
const LVM_LABEL: &[u8] = b"LABELONE";

fn magic_matches<R: Read + Seek>(reader: &mut R, offset: u64, magic: &[u8]) -> Result<bool, Error> {
    reader.seek(io::SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; magic.len()];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(buf == magic),
        // Device smaller than the probe offset: simply no match
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Sweeps the magic table and returns the first recognized filesystem kind.
pub fn detect_filesystem<R: Read + Seek>(reader: &mut R) -> Result<Option<Kind>, Error> {
    for test in SIGNATURE_TESTS {
        if magic_matches(reader, test.offset, test.magic)? {
            debug!("{} signature at offset {:#x}", test.kind, test.offset);
            return Ok(Some(test.kind));
        }
    }
    Ok(None)
}

/// Checks the first four sectors for an LVM physical volume label.
pub fn has_lvm_label<R: Read + Seek>(reader: &mut R) -> Result<bool, Error> {
    for sector in 0..4 {
        if magic_matches(reader, sector * 512, LVM_LABEL)? {
            debug!("LVM label in sector {sector}");
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn image_with(offset: usize, bytes: &[u8]) -> Cursor<Vec<u8>> {
        let mut image = vec![0u8; 128 * 1024];
        image[offset..offset + bytes.len()].copy_from_slice(bytes);
        Cursor::new(image)
    }

    #[test_log::test]
    fn test_detect_ext4() {
        let mut image = image_with(0x438, &[0x53, 0xEF]);
        assert_eq!(detect_filesystem(&mut image).unwrap(), Some(Kind::Ext4));
    }

    #[test_log::test]
    fn test_detect_xfs() {
        let mut image = image_with(0, b"XFSB");
        assert_eq!(detect_filesystem(&mut image).unwrap(), Some(Kind::Xfs));
    }

    #[test_log::test]
    fn test_detect_btrfs() {
        let mut image = image_with(0x10040, b"_BHRfS_M");
        assert_eq!(detect_filesystem(&mut image).unwrap(), Some(Kind::Btrfs));
    }

    #[test_log::test]
    fn test_detect_swap() {
        let mut image = image_with(4096 - 10, b"SWAPSPACE2");
        assert_eq!(detect_filesystem(&mut image).unwrap(), Some(Kind::Swap));
    }

    #[test_log::test]
    fn test_blank_image() {
        let mut image = Cursor::new(vec![0u8; 128 * 1024]);
        assert_eq!(detect_filesystem(&mut image).unwrap(), None);
    }

    #[test_log::test]
    fn test_tiny_device() {
        // Smaller than every probe offset; must not error
        let mut image = Cursor::new(vec![0u8; 16]);
        assert_eq!(detect_filesystem(&mut image).unwrap(), None);
    }

    #[test_log::test]
    fn test_lvm_label_second_sector() {
        let mut image = image_with(512, b"LABELONE");
        assert!(has_lvm_label(&mut image).unwrap());
    }

    #[test_log::test]
    fn test_no_lvm_label() {
        let mut image = Cursor::new(vec![0u8; 4096]);
        assert!(!has_lvm_label(&mut image).unwrap());
    }

    #[test_log::test]
    fn test_kind_display() {
        assert_eq!(Kind::Ext4.to_string(), "ext4");
        assert_eq!(Kind::Luks.to_string(), "crypto_LUKS");
    }
}
