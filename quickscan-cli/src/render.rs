// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Report rendering: fixed-width text table and JSON.

use inventory::InventoryRecord;

/// Full device path for display: multipath aggregates live under
/// `/dev/mapper`, everything else under `/dev`.
fn display_path(record: &InventoryRecord) -> String {
    if record.is_multipath() {
        format!("/dev/mapper/{}", record.identifier)
    } else {
        format!("/dev/{}", record.identifier)
    }
}

fn row(
    dev: &str,
    size: &str,
    rotates: &str,
    available: &str,
    model: &str,
    nodes: &str,
    reject: &str,
) -> String {
    format!("{dev:<25} {size:>10}  {rotates:<7}  {available:<9}  {model:<25} {nodes:<16} {reject}")
}

/// Renders the tabular report, one row per record.
pub fn as_text<'a>(records: impl Iterator<Item = &'a InventoryRecord>) -> String {
    let mut output = vec![row(
        "Device Path",
        "Size",
        "Rotates",
        "Available",
        "Model name",
        "Device Nodes",
        "Reject Reasons",
    )];

    for record in records {
        let reasons: Vec<String> = record.reject_reasons.iter().map(ToString::to_string).collect();
        output.push(row(
            &display_path(record),
            &record.human_readable_size,
            &record.rotational.to_string(),
            &record.available.to_string(),
            &record.model,
            &record.device_nodes.join(","),
            &reasons.join(","),
        ));
    }
    output.join("\n")
}

/// Renders the JSON report.
pub fn as_json<'a>(
    records: impl Iterator<Item = &'a InventoryRecord>,
) -> serde_json::Result<String> {
    let records: Vec<&InventoryRecord> = records.collect();
    serde_json::to_string_pretty(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory::{
        consolidate::ConsolidatedDevice, mock::baseline_attributes, DeviceIdentifier,
    };

    fn multipath_record() -> InventoryRecord {
        let device = ConsolidatedDevice {
            primary: DeviceIdentifier::from("mpatha"),
            outcome: Ok(baseline_attributes(20 * 1024 * 1024 * 1024)),
            nodes: vec!["sda".to_string(), "sdb".to_string()],
        };
        InventoryRecord::from_classified(device, Vec::new())
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path(&multipath_record()), "/dev/mapper/mpatha");
    }

    #[test]
    fn test_text_report_shape() {
        let record = multipath_record();
        let text = as_text([&record].into_iter());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Device Path"));
        assert!(lines[1].contains("/dev/mapper/mpatha"));
        assert!(lines[1].contains("sda,sdb"));
    }

    #[test]
    fn test_json_report_is_array() {
        let record = multipath_record();
        let json = as_json([&record].into_iter()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["identifier"], "mpatha");
    }
}
