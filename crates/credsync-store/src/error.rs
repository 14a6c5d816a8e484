//! Store error types.

use thiserror::Error;

use credsync_connector::DeviceId;

use crate::ids::AssignmentId;

/// Errors that can occur against the assignment store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another active assignment already holds this card value.
    ///
    /// Card numbers are never reused while active; rejected at creation
    /// time, never during reconciliation.
    #[error("card {card_data} is already actively assigned to employee {employee_id}")]
    DuplicateActiveCard {
        card_data: String,
        employee_id: String,
    },

    /// Assignment not found.
    #[error("card assignment not found: {id}")]
    AssignmentNotFound { id: AssignmentId },

    /// Enrollment row not found.
    #[error("no enrollment for user {device_user_id} on device {device_id}")]
    EnrollmentNotFound {
        device_id: DeviceId,
        device_user_id: String,
    },

    /// Attempted status change that the lifecycle does not allow.
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },
}

impl StoreError {
    /// Create a duplicate active card error.
    pub fn duplicate_active_card(
        card_data: impl Into<String>,
        employee_id: impl Into<String>,
    ) -> Self {
        Self::DuplicateActiveCard {
            card_data: card_data.into(),
            employee_id: employee_id.into(),
        }
    }

    /// Create an invalid status transition error.
    pub fn invalid_status_transition(
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidStatusTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Check if this error is a card conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::DuplicateActiveCard { .. })
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
