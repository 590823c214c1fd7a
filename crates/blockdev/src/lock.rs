// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Exclusive-open lock probing.
//!
//! The kernel refuses `O_EXCL` opens of a block device that another
//! subsystem already holds (mounted filesystem, dm table, md member). A
//! failed exclusive open is therefore the "in use" signal.

use std::{fs::OpenOptions, os::unix::fs::OpenOptionsExt, path::Path};

use nix::libc;

/// Returns true when the device node cannot be opened exclusively.
///
/// The descriptor is closed again immediately; this never mutates the
/// device.
pub fn is_locked(path: &Path) -> bool {
    match OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_EXCL)
        .open(path)
    {
        Ok(_fd) => false,
        Err(err) => {
            log::debug!("exclusive open of {} refused: {err}", path.display());
            true
        }
    }
}
