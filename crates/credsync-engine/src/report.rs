//! Structured sync results.
//!
//! Every sync entry point returns one of these instead of raising on
//! partial failure: per-item errors live in the device report, per-device
//! failures in the fleet report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use credsync_connector::{DeviceError, DeviceId};

/// A single failed item within one device's pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    /// Device user the action targeted.
    pub user_id: String,
    /// Human-readable failure description.
    pub error: String,
    /// Stable classification code.
    pub code: String,
}

impl ItemError {
    /// Record a device failure for one item.
    pub fn from_device_error(user_id: impl Into<String>, error: &DeviceError) -> Self {
        Self {
            user_id: user_id.into(),
            error: error.to_string(),
            code: error.error_code().to_string(),
        }
    }
}

/// Outcome of reconciling one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSyncReport {
    /// Device the pass ran against.
    pub device_id: DeviceId,
    /// Users created on the device.
    pub users_added: u32,
    /// Users whose card was rewritten.
    pub users_updated: u32,
    /// Users deleted from the device.
    pub users_removed: u32,
    /// Items that failed; the rest of the pass continued past them.
    pub errors: Vec<ItemError>,
    /// Whether the pass was cut short by cancellation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the pass.
    pub duration_ms: u64,
}

impl DeviceSyncReport {
    /// Start an empty report for a device.
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            users_added: 0,
            users_updated: 0,
            users_removed: 0,
            errors: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Record a failed item.
    pub fn record_error(&mut self, user_id: impl Into<String>, error: &DeviceError) {
        self.errors.push(ItemError::from_device_error(user_id, error));
    }

    /// Whether every planned action succeeded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }

    /// Whether the pass changed nothing (the device was already converged).
    pub fn is_noop(&self) -> bool {
        self.users_added == 0 && self.users_updated == 0 && self.users_removed == 0
    }

    /// Total successful actions.
    pub fn actions_applied(&self) -> u32 {
        self.users_added + self.users_updated + self.users_removed
    }
}

/// Per-device entry in a fleet report.
///
/// A device-level failure (connection lost, listing failed) is recorded
/// here with `success = false` and never aborts other devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceOutcome {
    /// Device the entry describes.
    pub device_id: DeviceId,
    /// Whether the pass ran to completion.
    pub success: bool,
    /// The pass report, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DeviceSyncReport>,
    /// The device-level failure, present otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceOutcome {
    /// Successful pass.
    pub fn ok(report: DeviceSyncReport) -> Self {
        Self {
            device_id: report.device_id,
            success: true,
            report: Some(report),
            error: None,
        }
    }

    /// Device-level failure.
    pub fn failed(device_id: DeviceId, error: impl Into<String>) -> Self {
        Self {
            device_id,
            success: false,
            report: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregated statistics over a fleet pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatistics {
    /// Devices attempted.
    #[serde(default)]
    pub devices_total: u32,
    /// Devices whose pass completed.
    #[serde(default)]
    pub devices_succeeded: u32,
    /// Devices that failed at the device level.
    #[serde(default)]
    pub devices_failed: u32,
    /// Users created across the fleet.
    #[serde(default)]
    pub users_added: u32,
    /// Cards rewritten across the fleet.
    #[serde(default)]
    pub users_updated: u32,
    /// Users deleted across the fleet.
    #[serde(default)]
    pub users_removed: u32,
    /// Per-item failures across the fleet.
    #[serde(default)]
    pub item_errors: u32,
    /// Item failures broken down by classification code.
    #[serde(default)]
    pub errors_by_code: HashMap<String, u32>,
    /// Total wall-clock duration.
    #[serde(default)]
    pub duration_ms: u64,
}

impl SyncStatistics {
    /// Fold one device outcome into the totals.
    pub fn record(&mut self, outcome: &DeviceOutcome) {
        self.devices_total += 1;
        match &outcome.report {
            Some(report) => {
                self.devices_succeeded += 1;
                self.users_added += report.users_added;
                self.users_updated += report.users_updated;
                self.users_removed += report.users_removed;
                self.item_errors += report.errors.len() as u32;
                for item in &report.errors {
                    *self.errors_by_code.entry(item.code.clone()).or_insert(0) += 1;
                }
            }
            None => self.devices_failed += 1,
        }
    }
}

/// Result of a sync across multiple devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSyncReport {
    /// One entry per attempted device.
    pub outcomes: Vec<DeviceOutcome>,
    /// Aggregated totals.
    pub statistics: SyncStatistics,
}

impl FleetSyncReport {
    /// Build a fleet report from collected outcomes.
    pub fn from_outcomes(outcomes: Vec<DeviceOutcome>, duration_ms: u64) -> Self {
        let mut statistics = SyncStatistics {
            duration_ms,
            ..SyncStatistics::default()
        };
        for outcome in &outcomes {
            statistics.record(outcome);
        }
        Self {
            outcomes,
            statistics,
        }
    }

    /// Whether every device pass completed (item errors permitted).
    pub fn all_devices_succeeded(&self) -> bool {
        self.statistics.devices_failed == 0
    }
}
