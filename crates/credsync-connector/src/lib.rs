//! # Device Capability Contract
//!
//! Traits and types for talking to physical access devices. The actual
//! transport (the source deployment uses an RPC protocol over TLS) lives
//! elsewhere; reconciliation only depends on this contract.
//!
//! - [`DeviceClient`]: per-device user/card operations
//! - [`DeviceDirectory`]: enumeration of connected devices
//! - [`DeviceError`]: taxonomy with transient/permanent classification

pub mod error;
pub mod ids;
pub mod traits;
pub mod types;

pub use error::{DeviceError, DeviceResult};
pub use ids::DeviceId;
pub use traits::{DeviceClient, DeviceDirectory};
pub use types::{CardWrite, DeviceEndpoint, DeviceUser, EnrollRequest};
