// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Key/value record filtering for report output.

use inventory::InventoryRecord;

/// Parsed `--filter key=value[,key=value...]` expression.
#[derive(Debug, Default)]
pub struct RecordFilter {
    clauses: Vec<(String, String)>,
}

impl RecordFilter {
    /// Parses a filter expression. Every clause needs a key and a value.
    pub fn parse(expression: &str) -> Result<Self, String> {
        let mut clauses = Vec::new();
        for clause in expression.split(',') {
            match clause.split_once('=') {
                Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                    clauses.push((key.trim().to_lowercase(), value.trim().to_string()));
                }
                _ => return Err(format!("invalid filter clause: {clause:?}")),
            }
        }
        Ok(Self { clauses })
    }

    /// True when the record matches every clause. Unknown keys are logged
    /// and ignored.
    pub fn matches(&self, record: &InventoryRecord) -> bool {
        self.clauses.iter().all(|(key, value)| {
            match key.as_str() {
                "identifier" | "path" => record.identifier.as_str() == value.as_str(),
                "model" => record.model == *value,
                "available" => {
                    matches!(value.to_lowercase().parse::<bool>(), Ok(v) if v == record.available)
                }
                "rotational" => {
                    matches!(value.to_lowercase().parse::<bool>(), Ok(v) if v == record.rotational)
                }
                other => {
                    log::debug!("filter key {other:?} not known, ignored");
                    true
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory::{
        consolidate::ConsolidatedDevice, mock::baseline_attributes, DeviceIdentifier,
        InventoryRecord,
    };

    fn record(name: &str) -> InventoryRecord {
        let device = ConsolidatedDevice {
            primary: DeviceIdentifier::from(name),
            outcome: Ok(baseline_attributes(20 * 1024 * 1024 * 1024)),
            nodes: vec![name.to_string()],
        };
        InventoryRecord::from_classified(device, Vec::new())
    }

    #[test]
    fn test_parse_rejects_bad_clauses() {
        assert!(RecordFilter::parse("available").is_err());
        assert!(RecordFilter::parse("available=").is_err());
        assert!(RecordFilter::parse("=true").is_err());
        assert!(RecordFilter::parse("available=true,").is_err());
    }

    #[test]
    fn test_boolean_matching() {
        let filter = RecordFilter::parse("available=true").unwrap();
        assert!(filter.matches(&record("sda")));

        let filter = RecordFilter::parse("available=false").unwrap();
        assert!(!filter.matches(&record("sda")));
    }

    #[test]
    fn test_path_and_unknown_keys() {
        let filter = RecordFilter::parse("path=sda,flavour=mint").unwrap();
        assert!(filter.matches(&record("sda")));
        assert!(!filter.matches(&record("sdb")));
    }
}
