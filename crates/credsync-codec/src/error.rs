//! Codec error types.

use thiserror::Error;

/// Error that can occur while converting card data.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input is not a valid hexadecimal string.
    #[error("invalid hex card data: {message}")]
    InvalidHex { message: String },

    /// Input is not a valid base64 string.
    #[error("invalid base64 card data: {message}")]
    InvalidBase64 { message: String },

    /// Input is not a valid decimal card number.
    #[error("invalid decimal card number: {value}")]
    InvalidDecimal { value: String },

    /// Input matched neither the hex nor the base64 format.
    #[error("card data is neither hex nor base64: {value}")]
    UnrecognizedFormat { value: String },
}

impl CodecError {
    /// Create an invalid hex error.
    pub fn invalid_hex(message: impl Into<String>) -> Self {
        Self::InvalidHex {
            message: message.into(),
        }
    }

    /// Create an invalid base64 error.
    pub fn invalid_base64(message: impl Into<String>) -> Self {
        Self::InvalidBase64 {
            message: message.into(),
        }
    }

    /// Create an invalid decimal error.
    pub fn invalid_decimal(value: impl Into<String>) -> Self {
        Self::InvalidDecimal {
            value: value.into(),
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
