// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! MBR inspection: conventional partition tables and the GPT protective
//! entry.

use std::io::{self, Read, Seek};

use zerocopy::*;

use crate::Error;

/// GPT protective partition type
const PROTECTIVE_TYPE: u8 = 0xEE;

/// One entry of the classic MBR partition table
#[derive(Debug, FromBytes)]
#[repr(C)]
pub struct PartitionEntry {
    status: u8,
    chs_first: [u8; 3],
    kind: u8,
    chs_last: [u8; 3],
    lba_start: U32<LittleEndian>,
    sectors: U32<LittleEndian>,
}

/// Master Boot Record, as found in LBA 0
#[derive(Debug, FromBytes)]
#[repr(C)]
pub struct Mbr {
    bootstrap: [u8; 446],
    entries: [PartitionEntry; 4],
    signature: [u8; 2],
}

impl Mbr {
    /// Reads the first sector and returns the MBR when the boot signature
    /// is present. `None` means the device has no MBR at all.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Option<Self>, Error> {
        reader.seek(io::SeekFrom::Start(0))?;
        let mut sector = [0u8; 512];
        match reader.read_exact(&mut sector) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        match Mbr::read_from_bytes(&sector) {
            Ok(mbr) if mbr.signature == [0x55, 0xAA] => {
                log::debug!(
                    "MBR with {} entries, protective={}",
                    mbr.partition_count(),
                    mbr.is_protective()
                );
                Ok(Some(mbr))
            }
            _ => Ok(None),
        }
    }

    /// True when any table entry carries the GPT protective type.
    pub fn is_protective(&self) -> bool {
        self.entries.iter().any(|e| e.kind == PROTECTIVE_TYPE)
    }

    /// Number of populated partition entries.
    pub fn partition_count(&self) -> usize {
        self.entries.iter().filter(|e| e.kind != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sector_with_entry(kind: u8) -> Cursor<Vec<u8>> {
        let mut sector = vec![0u8; 512];
        sector[446 + 4] = kind; // type byte of the first entry
        sector[510] = 0x55;
        sector[511] = 0xAA;
        Cursor::new(sector)
    }

    #[test_log::test]
    fn test_protective_mbr() {
        let mut image = sector_with_entry(PROTECTIVE_TYPE);
        let mbr = Mbr::read_from(&mut image).unwrap().unwrap();
        assert!(mbr.is_protective());
        assert_eq!(mbr.partition_count(), 1);
    }

    #[test_log::test]
    fn test_conventional_table() {
        let mut image = sector_with_entry(0x83); // Linux partition
        let mbr = Mbr::read_from(&mut image).unwrap().unwrap();
        assert!(!mbr.is_protective());
        assert_eq!(mbr.partition_count(), 1);
    }

    #[test_log::test]
    fn test_no_signature() {
        let mut image = Cursor::new(vec![0u8; 512]);
        assert!(Mbr::read_from(&mut image).unwrap().is_none());
    }

    #[test_log::test]
    fn test_short_device() {
        let mut image = Cursor::new(vec![0u8; 64]);
        assert!(Mbr::read_from(&mut image).unwrap().is_none());
    }
}
