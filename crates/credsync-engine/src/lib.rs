//! # Reconciliation Engine
//!
//! Keeps a fleet of physical access devices converged on the assignment
//! database. The database is the source of truth; each device holds an
//! independently-mutable projection of it, and this crate computes and
//! applies the difference.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       SyncOrchestrator                        │
//! │    bounded fan-out over connected devices, fleet reports      │
//! ├───────────────────────────────────────────────────────────────┤
//! │                       ReconcileEngine                         │
//! │                                                               │
//! │   AssignmentRepository ──► compute_plan ◄── DeviceClient      │
//! │        (desired)              │               (actual)        │
//! │                               ▼                               │
//! │                 Enroll → Update → Remove                      │
//! │              (sequential within one device)                   │
//! │                               │                               │
//! │                               ▼                               │
//! │                  DeviceEnrollment ledger                      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure semantics
//!
//! One failing item never blocks the rest of a device's pass; one failing
//! device never blocks the rest of the fleet. Every entry point returns a
//! structured report listing successes and failures. Passes are idempotent
//! and safe to re-run: a cancelled or partially-failed pass leaves drift
//! that the next pass converges.
//!
//! ## Usage
//!
//! ```ignore
//! use credsync_engine::{AutoSyncRegistry, ReconcileEngine, SyncOrchestrator};
//!
//! let engine = Arc::new(ReconcileEngine::new(repo.clone(), devices));
//! let orchestrator = SyncOrchestrator::new(engine.clone(), repo, directory);
//!
//! // Manual fleet pass
//! let fleet = orchestrator.sync_all().await?;
//!
//! // Targeted pass after a card change
//! let fleet = orchestrator.sync_assignment(assignment_id).await?;
//!
//! // Periodic per-device reconciliation
//! let auto = AutoSyncRegistry::new(engine);
//! auto.start(device_id, Duration::from_secs(300));
//! ```

pub mod autosync;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod report;

pub use autosync::AutoSyncRegistry;
pub use engine::{EngineConfig, ReconcileEngine, ScopePolicy};
pub use error::{EngineError, EngineResult};
pub use orchestrator::{OrchestratorConfig, SyncOrchestrator};
pub use plan::{compute_plan, ReconcilePlan};
pub use report::{
    DeviceOutcome, DeviceSyncReport, FleetSyncReport, ItemError, SyncStatistics,
};
