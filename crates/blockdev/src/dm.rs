// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Device-mapper multipath discovery.
//!
//! Multipath devices surface twice: as `dm-N` nodes under `/sys/block` and
//! as named symlinks under `/dev/mapper`. The mapper name is the stable,
//! human-facing identity; the `dm-N` node is where the attributes live.

use std::{fs, io, path::Path};

const MAPPER_DIR: &str = "dev/mapper";
const BLOCK_DIR: &str = "sys/block";
const MULTIPATH_PREFIX: &str = "mpath";

/// One multipath device and the physical paths behind it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipathGroup {
    /// Mapper name, e.g. `mpatha`
    pub name: String,
    /// Backing device-mapper node, e.g. `dm-0`
    pub node: String,
    /// Underlying path device names, sorted (e.g. `sda`, `sdb`)
    pub paths: Vec<String>,
}

/// Discovers multipath groups by walking the `/dev/mapper` symlinks and the
/// `slaves/` directory of each backing `dm-N` node.
///
/// A host without device-mapper simply has no mapper directory; that is an
/// empty result, not an error.
pub fn multipath_groups(sysroot: &Path) -> io::Result<Vec<MultipathGroup>> {
    let mapper = sysroot.join(MAPPER_DIR);
    if !mapper.is_dir() {
        return Ok(Vec::new());
    }

    let mut groups = Vec::new();
    for entry in fs::read_dir(&mapper)?.filter_map(Result::ok) {
        let name = match entry.file_name().to_str() {
            Some(n) if n.starts_with(MULTIPATH_PREFIX) => n.to_owned(),
            _ => continue,
        };
        let Some(node) = resolve_mapper(sysroot, &name) else {
            log::warn!("mapper entry {name} does not resolve to a dm node, skipped");
            continue;
        };
        let paths = slaves(sysroot, &node)?;
        groups.push(MultipathGroup { name, node, paths });
    }
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    log::debug!("{} multipath groups detected", groups.len());
    Ok(groups)
}

/// Resolves a `/dev/mapper` name to its backing `dm-N` node name.
pub fn resolve_mapper(sysroot: &Path, name: &str) -> Option<String> {
    let link = sysroot.join(MAPPER_DIR).join(name);
    let target = fs::read_link(link).ok()?;
    Some(target.file_name()?.to_str()?.to_owned())
}

/// Lists the underlying device names of a device-mapper node, sorted.
pub fn slaves(sysroot: &Path, node: &str) -> io::Result<Vec<String>> {
    let dir = sysroot.join(BLOCK_DIR).join(node).join("slaves");
    let mut paths: Vec<String> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter_map(|e| Some(e.file_name().to_str()?.to_owned()))
        .collect();
    paths.sort();
    Ok(paths)
}
