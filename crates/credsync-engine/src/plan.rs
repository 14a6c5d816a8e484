//! Three-way diff between desired and actual device state.
//!
//! Pure computation: no I/O, no clocks. The engine feeds it the active
//! assignments in scope and the live device listing and gets back the
//! minimal set of actions that converges the device.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use credsync_codec::cards_equal;
use credsync_connector::DeviceUser;
use credsync_store::CardAssignment;

/// The actions required to converge one device onto the desired state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcilePlan {
    /// Desired users absent from the device: create, then set card.
    pub to_enroll: Vec<CardAssignment>,
    /// Users present on both sides with a differing card value.
    pub to_update: Vec<CardAssignment>,
    /// Device user IDs with no corresponding active assignment.
    pub to_remove: Vec<String>,
}

impl ReconcilePlan {
    /// Whether the device already matches the desired state.
    pub fn is_converged(&self) -> bool {
        self.to_enroll.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }

    /// Total number of planned actions.
    pub fn action_count(&self) -> usize {
        self.to_enroll.len() + self.to_update.len() + self.to_remove.len()
    }
}

/// Compute the diff between desired assignments and the device's live
/// listing, matching on employee ID / device user ID.
///
/// Card values are compared numerically: a device reporting the
/// zero-stripped buffer `AABBCC` matches a canonical 64-nibble database
/// value of the same number. Card data that fails to decode on either side
/// forces an update so the next pass writes a known-good value.
///
/// If the desired set carries more than one assignment for the same
/// employee (a policy violation the store does not hard-enforce), the
/// first one wins and the rest are ignored.
pub fn compute_plan(desired: &[CardAssignment], actual: &[DeviceUser]) -> ReconcilePlan {
    let actual_by_id: HashMap<&str, &DeviceUser> =
        actual.iter().map(|user| (user.id.as_str(), user)).collect();

    let mut plan = ReconcilePlan::default();
    let mut seen_employees: HashSet<&str> = HashSet::new();

    for assignment in desired {
        if !seen_employees.insert(assignment.employee_id.as_str()) {
            continue;
        }

        match actual_by_id.get(assignment.employee_id.as_str()) {
            None => plan.to_enroll.push(assignment.clone()),
            Some(user) => {
                if !device_card_matches(user, &assignment.card_data) {
                    plan.to_update.push(assignment.clone());
                }
            }
        }
    }

    let mut to_remove: Vec<String> = actual
        .iter()
        .filter(|user| !seen_employees.contains(user.id.as_str()))
        .map(|user| user.id.clone())
        .collect();
    to_remove.sort();
    plan.to_remove = to_remove;

    plan
}

fn device_card_matches(user: &DeviceUser, desired_card: &str) -> bool {
    if !user.has_card {
        return false;
    }
    match user.card_data.as_deref() {
        Some(actual_card) => cards_equal(actual_card, desired_card),
        None => false,
    }
}
