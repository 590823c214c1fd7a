// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The inventory aggregate handed to rendering layers.
//!
//! Field names are the stable contract consumed by both the tabular and
//! the JSON renderer; nothing here is mutated after classification.

use serde::Serialize;

use crate::{
    classify::RejectReason,
    consolidate::ConsolidatedDevice,
    device::DeviceIdentifier,
    policy::human_readable_size,
};

/// One classified logical device.
#[derive(Clone, Debug, Serialize)]
pub struct InventoryRecord {
    /// Primary device identifier
    pub identifier: DeviceIdentifier,
    /// Size in bytes; zero when the probe failed
    pub size: u64,
    /// Size rendered for humans
    pub human_readable_size: String,
    /// Rotational media flag
    pub rotational: bool,
    /// Model name; may be empty
    pub model: String,
    /// True exactly when the reject reason set is empty
    pub available: bool,
    /// Contributing device node names
    pub device_nodes: Vec<String>,
    /// Complete ordered reject reason set
    pub reject_reasons: Vec<RejectReason>,
}

impl InventoryRecord {
    /// Seals a consolidated device and its classification into a record.
    pub fn from_classified(device: ConsolidatedDevice, reject_reasons: Vec<RejectReason>) -> Self {
        let (size, rotational, model) = match &device.outcome {
            Ok(attrs) => (attrs.size, attrs.rotational, attrs.model.clone()),
            Err(_) => (0, false, String::new()),
        };
        Self {
            identifier: device.primary,
            size,
            human_readable_size: human_readable_size(size),
            rotational,
            model,
            available: reject_reasons.is_empty(),
            device_nodes: device.nodes,
            reject_reasons,
        }
    }

    /// True when this record represents a multipath aggregate.
    pub fn is_multipath(&self) -> bool {
        self.device_nodes.len() != 1 || self.device_nodes[0] != self.identifier.as_str()
    }
}

/// Ordered, immutable scan result: one record per logical device, sorted
/// by identifier.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct InventoryAggregate {
    records: Vec<InventoryRecord>,
}

impl InventoryAggregate {
    pub fn new(mut records: Vec<InventoryRecord>) -> Self {
        records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Self { records }
    }

    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::ProbeFailure, mock::baseline_attributes};

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_record_fields() {
        let device = ConsolidatedDevice {
            primary: DeviceIdentifier::from("sda"),
            outcome: Ok(baseline_attributes(20 * GIB)),
            nodes: vec!["sda".to_string()],
        };
        let record = InventoryRecord::from_classified(device, Vec::new());
        assert!(record.available);
        assert_eq!(record.human_readable_size, "20.00 GB");
        assert!(!record.is_multipath());
    }

    #[test]
    fn test_failed_probe_record() {
        let device = ConsolidatedDevice {
            primary: DeviceIdentifier::from("sdb"),
            outcome: Err(ProbeFailure::Timeout),
            nodes: vec!["sdb".to_string()],
        };
        let reasons = vec![RejectReason::ProbeFailed("timeout".to_string())];
        let record = InventoryRecord::from_classified(device, reasons);
        assert!(!record.available);
        assert_eq!(record.size, 0);
    }

    #[test]
    fn test_aggregate_ordering() {
        let records = ["sdc", "sda", "mpatha"]
            .into_iter()
            .map(|name| {
                let device = ConsolidatedDevice {
                    primary: DeviceIdentifier::from(name),
                    outcome: Ok(baseline_attributes(20 * GIB)),
                    nodes: vec![name.to_string()],
                };
                InventoryRecord::from_classified(device, Vec::new())
            })
            .collect();

        let aggregate = InventoryAggregate::new(records);
        let order: Vec<&str> = aggregate.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(order, vec!["mpatha", "sda", "sdc"]);
    }
}
