//! # Assignment Store
//!
//! Authoritative model for card assignments and their per-device
//! enrollment ledger, plus the repository contract the reconciliation
//! engine consumes.
//!
//! Records are never physically deleted: assignment revocation and
//! enrollment removal are status transitions, preserving the audit trail
//! operators use to inspect drift.

pub mod error;
pub mod ids;
pub mod memory;
pub mod model;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use ids::AssignmentId;
pub use memory::MemoryAssignmentStore;
pub use model::{
    AssignmentStatus, CardAssignment, CardType, DeviceEnrollment, EnrollmentStatus,
};
pub use repository::AssignmentRepository;
