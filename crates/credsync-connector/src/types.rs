//! Wire-facing device types.
//!
//! These are the ephemeral projections exchanged with a device during a
//! reconciliation pass. None of them are persisted.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::ids::DeviceId;

/// A user as the device reports it, read live during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUser {
    /// Identifier the device knows the user by (normally the employee ID).
    pub id: String,
    /// Whether the device holds a card for this user.
    pub has_card: bool,
    /// Raw card data as the device reports it. Devices commonly strip
    /// leading zero bytes, so this is compared numerically, never textually.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_data: Option<String>,
}

impl DeviceUser {
    /// Create a user record with a card.
    pub fn with_card(id: impl Into<String>, card_data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            has_card: true,
            card_data: Some(card_data.into()),
        }
    }

    /// Create a user record without a card.
    pub fn without_card(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            has_card: false,
            card_data: None,
        }
    }
}

/// Request to create a user on a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    /// Identifier the device should store the user under.
    pub id: String,
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EnrollRequest {
    /// Create an enroll request.
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self { id: id.into(), name }
    }
}

/// Request to write a card onto an already-enrolled device user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardWrite {
    /// Identifier of the user on the device.
    pub user_id: String,
    /// Canonical hex card data to write.
    pub card_data: String,
}

impl CardWrite {
    /// Create a card write request.
    pub fn new(user_id: impl Into<String>, card_data: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            card_data: card_data.into(),
        }
    }
}

/// A connected device as the directory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    /// Device identifier.
    pub device_id: DeviceId,
    /// Address the device is currently reachable on.
    pub ip: IpAddr,
    /// RPC port.
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_user_constructors() {
        let user = DeviceUser::with_card("emp1", "AABBCC");
        assert!(user.has_card);
        assert_eq!(user.card_data.as_deref(), Some("AABBCC"));

        let user = DeviceUser::without_card("emp2");
        assert!(!user.has_card);
        assert!(user.card_data.is_none());
    }

    #[test]
    fn test_device_user_serialization_omits_missing_card() {
        let user = DeviceUser::without_card("emp2");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("card_data"));
    }

    #[test]
    fn test_endpoint_round_trip() {
        let endpoint = DeviceEndpoint {
            device_id: DeviceId::new(),
            ip: "10.0.0.7".parse().unwrap(),
            port: 4370,
        };
        let json = serde_json::to_string(&endpoint).unwrap();
        let parsed: DeviceEndpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, endpoint);
    }
}
