//! Device client error types
//!
//! Error definitions with transient/permanent classification, used by the
//! reconciliation engine to decide between retry, re-enroll, and abort.

use thiserror::Error;

use crate::ids::DeviceId;

/// Error that can occur while talking to a device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device does not know the given user.
    ///
    /// Recoverable during reconciliation: a card write that hits this error
    /// is retried as a fresh enrollment.
    #[error("user not found on device: {user_id}")]
    NotFound { user_id: String },

    /// The device connection was lost or could not be established.
    ///
    /// Aborts the current device's pass; other devices are unaffected.
    #[error("device unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A device RPC did not complete within the configured timeout.
    #[error("device call timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The device rejected the request or returned a malformed response.
    #[error("device protocol error: {message}")]
    Protocol { message: String },

    /// No device with this ID is known to the directory.
    #[error("device not registered: {device_id}")]
    UnknownDevice { device_id: DeviceId },

    /// The device rejected the card payload.
    #[error("device rejected card data: {message}")]
    InvalidCardData { message: String },
}

impl DeviceError {
    /// Check if this error is transient and the operation may succeed on a
    /// later pass.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeviceError::Unavailable { .. } | DeviceError::Timeout { .. }
        )
    }

    /// Check if this error means the user must be created before the
    /// operation can succeed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeviceError::NotFound { .. })
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DeviceError::NotFound { .. } => "USER_NOT_FOUND",
            DeviceError::Unavailable { .. } => "DEVICE_UNAVAILABLE",
            DeviceError::Timeout { .. } => "DEVICE_TIMEOUT",
            DeviceError::Protocol { .. } => "PROTOCOL_ERROR",
            DeviceError::UnknownDevice { .. } => "UNKNOWN_DEVICE",
            DeviceError::InvalidCardData { .. } => "INVALID_CARD_DATA",
        }
    }

    // Convenience constructors

    /// Create a not found error.
    pub fn not_found(user_id: impl Into<String>) -> Self {
        DeviceError::NotFound {
            user_id: user_id.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        DeviceError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an unavailable error with source.
    pub fn unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DeviceError::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        DeviceError::Protocol {
            message: message.into(),
        }
    }

    /// Create an invalid card data error.
    pub fn invalid_card_data(message: impl Into<String>) -> Self {
        DeviceError::InvalidCardData {
            message: message.into(),
        }
    }
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
