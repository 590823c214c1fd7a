// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Eligibility classification.
//!
//! Every rule is evaluated for every device; a record carries the complete
//! set of reject reasons so the caller can show full diagnostics. Output
//! depends only on the attributes and the policy.

use serde::{Serialize, Serializer};

use crate::{
    consolidate::ConsolidatedDevice,
    policy::{human_readable_size, Policy},
};

/// Why a device is ineligible. Rendered text is the stable, human-facing
/// contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Held exclusively by another subsystem
    Locked,
    /// Carries an LVM physical volume signature
    LvmDevice,
    /// Carries a GPT protective MBR
    PmbrDetected,
    /// Carries a recognized filesystem signature
    FilesystemDetected(String),
    /// Has a partition table with at least one partition
    HasPartitions,
    /// Below the policy's minimum size
    TooSmall { min_bytes: u64 },
    /// The probe itself failed; attributes are unknown
    ProbeFailed(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Locked => f.write_str("Locked"),
            RejectReason::LvmDevice => f.write_str("LVM device"),
            RejectReason::PmbrDetected => f.write_str("PMBR detected"),
            RejectReason::FilesystemDetected(fs) => write!(f, "{fs} detected"),
            RejectReason::HasPartitions => f.write_str("Has partitions"),
            RejectReason::TooSmall { min_bytes } => {
                write!(f, "Device too small (< {})", human_readable_size(*min_bytes))
            }
            RejectReason::ProbeFailed(cause) => write!(f, "Probe failed ({cause})"),
        }
    }
}

impl Serialize for RejectReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Applies the ordered rule set to one consolidated device.
///
/// Rules never short-circuit: a device accumulates every reason that
/// applies, in rule order.
pub fn classify(device: &ConsolidatedDevice, policy: &Policy) -> Vec<RejectReason> {
    let attrs = match &device.outcome {
        Ok(attrs) => attrs,
        Err(cause) => return vec![RejectReason::ProbeFailed(cause.to_string())],
    };

    let mut reasons = Vec::new();
    if attrs.locked {
        reasons.push(RejectReason::Locked);
    }
    if attrs.lvm_pv {
        reasons.push(RejectReason::LvmDevice);
    }
    if attrs.pmbr {
        reasons.push(RejectReason::PmbrDetected);
    }
    if let Some(fs) = &attrs.filesystem {
        reasons.push(RejectReason::FilesystemDetected(fs.clone()));
    }
    if attrs.has_partitions {
        reasons.push(RejectReason::HasPartitions);
    }
    if attrs.size < policy.min_device_size {
        reasons.push(RejectReason::TooSmall {
            min_bytes: policy.min_device_size,
        });
    }
    reasons
}
