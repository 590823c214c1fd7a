// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Multipath consolidation.
//!
//! A multipath group is reported once, under its multipath identifier,
//! with its physical paths folded into the contributing node set. Raw
//! devices outside any group pass through as single-path records.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::{
    device::{DeviceIdentifier, RawDeviceAttributes},
    errors::ProbeFailure,
    scan::ScanResults,
};

/// One logical device as it will be reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsolidatedDevice {
    /// Reporting identifier; the multipath name when one exists
    pub primary: DeviceIdentifier,
    /// Representative attributes, or the failure that left the device
    /// unreadable
    pub outcome: Result<RawDeviceAttributes, ProbeFailure>,
    /// Ordered contributing device node names
    pub nodes: Vec<String>,
}

/// Folds per-path probe results into logical device records, ordered by
/// primary identifier.
///
/// Every identifier present in `results` lands in exactly one record's
/// contributing set: multipath members under their group, everything else
/// under itself.
pub fn consolidate(
    results: ScanResults,
    multipath: &BTreeMap<DeviceIdentifier, Vec<DeviceIdentifier>>,
) -> Vec<ConsolidatedDevice> {
    let covered: BTreeSet<&DeviceIdentifier> = multipath.values().flatten().collect();
    let mut devices = Vec::new();

    for (mpath_id, paths) in multipath {
        let outcome = representative(&results, mpath_id, paths);
        let nodes = paths.iter().map(|p| p.as_str().to_owned()).collect();
        devices.push(ConsolidatedDevice {
            primary: mpath_id.clone(),
            outcome,
            nodes,
        });
    }

    for (id, outcome) in results {
        if covered.contains(&id) || multipath.contains_key(&id) {
            continue;
        }
        let nodes = vec![id.as_str().to_owned()];
        devices.push(ConsolidatedDevice {
            primary: id,
            outcome,
            nodes,
        });
    }

    devices.sort_by(|a, b| a.primary.cmp(&b.primary));
    devices
}

/// Picks the attributes that represent a multipath group: the group's own
/// probe when it succeeded, otherwise the majority among its paths.
/// Disagreements are logged, never fatal.
fn representative(
    results: &ScanResults,
    mpath_id: &DeviceIdentifier,
    paths: &[DeviceIdentifier],
) -> Result<RawDeviceAttributes, ProbeFailure> {
    let path_ok: Vec<(&DeviceIdentifier, &RawDeviceAttributes)> = paths
        .iter()
        .filter_map(|p| match results.get(p) {
            Some(Ok(attrs)) => Some((p, attrs)),
            _ => None,
        })
        .collect();
    let failed_paths: Vec<&DeviceIdentifier> = paths
        .iter()
        .filter(|p| !matches!(results.get(*p), Some(Ok(_))))
        .collect();

    if !failed_paths.is_empty() && !path_ok.is_empty() {
        warn!(
            "consolidation discrepancy: {mpath_id} paths {failed_paths:?} unusable, \
             continuing with the surviving paths"
        );
    }

    let mut attrs = match results.get(mpath_id) {
        Some(Ok(own)) => {
            check_agreement(mpath_id, own, &path_ok);
            own.clone()
        }
        _ => match majority(mpath_id, &path_ok) {
            Some(attrs) => attrs,
            None => {
                // Nothing usable at all: surface the most specific failure
                return Err(match results.get(mpath_id) {
                    Some(Err(cause)) => cause.clone(),
                    _ => paths
                        .iter()
                        .find_map(|p| match results.get(p) {
                            Some(Err(cause)) => Some(cause.clone()),
                            _ => None,
                        })
                        .unwrap_or(ProbeFailure::Disappeared),
                });
            }
        },
    };

    // The aggregate reports its member paths regardless of which probe the
    // attributes came from.
    attrs.paths = paths.to_vec();
    Ok(attrs)
}

fn check_agreement(
    mpath_id: &DeviceIdentifier,
    own: &RawDeviceAttributes,
    path_ok: &[(&DeviceIdentifier, &RawDeviceAttributes)],
) {
    for (path, attrs) in path_ok {
        if attrs.size != own.size || attrs.rotational != own.rotational || attrs.model != own.model
        {
            warn!(
                "consolidation discrepancy: {mpath_id} path {path} reports \
                 size={} rotational={} model={:?} against {}/{}/{:?}",
                attrs.size, attrs.rotational, attrs.model, own.size, own.rotational, own.model
            );
        }
    }
}

/// Majority vote over (size, rotational); the first path carrying the
/// winning pair supplies the full attribute set.
fn majority(
    mpath_id: &DeviceIdentifier,
    path_ok: &[(&DeviceIdentifier, &RawDeviceAttributes)],
) -> Option<RawDeviceAttributes> {
    if path_ok.is_empty() {
        return None;
    }

    let mut counts: BTreeMap<(u64, bool), usize> = BTreeMap::new();
    for (_, attrs) in path_ok {
        *counts.entry((attrs.size, attrs.rotational)).or_default() += 1;
    }
    if counts.len() > 1 {
        warn!("consolidation discrepancy: {mpath_id} paths disagree on size/rotational: {counts:?}");
    }
    let (winner, _) = counts.into_iter().max_by_key(|(_, count)| *count)?;

    path_ok
        .iter()
        .find(|(_, attrs)| (attrs.size, attrs.rotational) == winner)
        .map(|(_, attrs)| (*attrs).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::baseline_attributes;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn id(name: &str) -> DeviceIdentifier {
        DeviceIdentifier::from(name)
    }

    fn group(paths: &[&str]) -> BTreeMap<DeviceIdentifier, Vec<DeviceIdentifier>> {
        let mut map = BTreeMap::new();
        map.insert(id("mpatha"), paths.iter().map(|p| id(p)).collect());
        map
    }

    #[test_log::test]
    fn test_multipath_folding() {
        let mut results = ScanResults::new();
        for name in ["sda", "sdb", "sdc"] {
            results.insert(id(name), Ok(baseline_attributes(20 * GIB)));
        }
        results.insert(id("mpatha"), Ok(baseline_attributes(20 * GIB)));

        let devices = consolidate(results, &group(&["sda", "sdb", "sdc"]));
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].primary, id("mpatha"));
        assert_eq!(devices[0].nodes, vec!["sda", "sdb", "sdc"]);
        assert_eq!(
            devices[0].outcome.as_ref().unwrap().paths,
            vec![id("sda"), id("sdb"), id("sdc")]
        );
    }

    #[test_log::test]
    fn test_model_disagreement_is_not_fatal() {
        let mut own = baseline_attributes(20 * GIB);
        own.model = "Array LUN".to_string();
        let mut path_attrs = baseline_attributes(20 * GIB);
        path_attrs.model = "Rebadged LUN".to_string();

        let mut results = ScanResults::new();
        results.insert(id("mpatha"), Ok(own.clone()));
        results.insert(id("sda"), Ok(path_attrs));

        // Logged as a discrepancy; the group's own attributes still win.
        let devices = consolidate(results, &group(&["sda"]));
        assert_eq!(devices.len(), 1);
        let attrs = devices[0].outcome.as_ref().unwrap();
        assert_eq!(attrs.model, "Array LUN");
        assert_eq!(attrs.size, own.size);
    }

    #[test_log::test]
    fn test_standalone_devices_pass_through() {
        let mut results = ScanResults::new();
        results.insert(id("sda"), Ok(baseline_attributes(20 * GIB)));
        results.insert(id("sdb"), Ok(baseline_attributes(40 * GIB)));

        let devices = consolidate(results, &BTreeMap::new());
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].primary, id("sda"));
        assert_eq!(devices[0].nodes, vec!["sda"]);
        assert_eq!(devices[1].primary, id("sdb"));
    }

    #[test_log::test]
    fn test_failed_path_does_not_fail_group() {
        let mut results = ScanResults::new();
        results.insert(id("sda"), Ok(baseline_attributes(20 * GIB)));
        results.insert(id("sdb"), Err(ProbeFailure::Timeout));
        results.insert(id("mpatha"), Err(ProbeFailure::Disappeared));

        let devices = consolidate(results, &group(&["sda", "sdb"]));
        assert_eq!(devices.len(), 1);
        let attrs = devices[0].outcome.as_ref().unwrap();
        assert_eq!(attrs.size, 20 * GIB);
        assert_eq!(devices[0].nodes, vec!["sda", "sdb"]);
    }

    #[test_log::test]
    fn test_majority_wins_on_disagreement() {
        let mut small = baseline_attributes(20 * GIB);
        small.size = 10 * GIB;
        let mut results = ScanResults::new();
        results.insert(id("sda"), Ok(baseline_attributes(20 * GIB)));
        results.insert(id("sdb"), Ok(baseline_attributes(20 * GIB)));
        results.insert(id("sdc"), Ok(small));

        let devices = consolidate(results, &group(&["sda", "sdb", "sdc"]));
        assert_eq!(devices[0].outcome.as_ref().unwrap().size, 20 * GIB);
    }

    #[test_log::test]
    fn test_group_with_no_usable_result() {
        let mut results = ScanResults::new();
        results.insert(id("sda"), Err(ProbeFailure::Timeout));
        results.insert(id("sdb"), Err(ProbeFailure::Timeout));
        results.insert(id("mpatha"), Err(ProbeFailure::Disappeared));

        let devices = consolidate(results, &group(&["sda", "sdb"]));
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].outcome, Err(ProbeFailure::Disappeared));
    }

    #[test_log::test]
    fn test_every_identifier_covered_once() {
        let mut results = ScanResults::new();
        for name in ["sda", "sdb", "sdc", "mpatha"] {
            results.insert(id(name), Ok(baseline_attributes(20 * GIB)));
        }

        let devices = consolidate(results, &group(&["sda", "sdb"]));
        let mut nodes: Vec<&str> = devices
            .iter()
            .flat_map(|d| d.nodes.iter().map(String::as_str))
            .collect();
        nodes.sort();
        assert_eq!(nodes, vec!["sda", "sdb", "sdc"]);
        // raw count (3) - path count (2) + group count (1)
        assert_eq!(devices.len(), 2);
    }
}
