//! Engine error types.
//!
//! Per-item device failures never surface here: they are recorded in the
//! pass report and reconciliation continues. What does surface is a
//! device-level failure (the listing call failed, so there is no actual
//! state to diff against) or a store failure (an invariant the engine
//! cannot work around).

use thiserror::Error;

use credsync_connector::DeviceError;
use credsync_store::StoreError;

/// Errors that abort a single device's reconciliation pass.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Assignment store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Device-level failure (listing failed or connection lost before the
    /// diff could be computed).
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

impl EngineError {
    /// Check if a later pass may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Device(e) => e.is_transient(),
            Self::Store(_) => false,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
