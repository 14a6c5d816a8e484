//! Assignment and enrollment records.
//!
//! `CardAssignment` is the authoritative database record linking an
//! employee to a credential; `DeviceEnrollment` is the last known
//! projection of one assignment onto one device. Neither is ever physically
//! deleted; lifecycle is carried in the status columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credsync_connector::DeviceId;

use crate::ids::AssignmentId;

/// Physical credential technology of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    /// Card serial number.
    Csn,
    /// Encrypted sector credential.
    Secure,
    /// Plain access credential.
    Access,
    /// Wiegand-format credential.
    Wiegand,
    /// QR code credential.
    Qr,
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csn => write!(f, "csn"),
            Self::Secure => write!(f, "secure"),
            Self::Access => write!(f, "access"),
            Self::Wiegand => write!(f, "wiegand"),
            Self::Qr => write!(f, "qr"),
        }
    }
}

impl std::str::FromStr for CardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csn" => Ok(Self::Csn),
            "secure" => Ok(Self::Secure),
            "access" => Ok(Self::Access),
            "wiegand" => Ok(Self::Wiegand),
            "qr" => Ok(Self::Qr),
            _ => Err(format!("Invalid card type: {s}")),
        }
    }
}

/// Lifecycle status of a card assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Credential is valid and must be present on devices.
    Active,
    /// Explicitly revoked or superseded by a reassignment.
    Revoked,
    /// Reported lost; treated as revoked for projection purposes.
    Lost,
    /// Validity period ended.
    Expired,
}

impl AssignmentStatus {
    /// Whether the assignment should be projected onto devices.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Revoked => write!(f, "revoked"),
            Self::Lost => write!(f, "lost"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            "lost" => Ok(Self::Lost),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Invalid assignment status: {s}")),
        }
    }
}

/// Status of one assignment's projection onto one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// User exists on the device with the desired card.
    Active,
    /// Enrollment has been initiated but the card write is not confirmed.
    Pending,
    /// User was deleted from the device (or the assignment went inactive).
    Removed,
}

impl EnrollmentStatus {
    /// Whether the row still represents presence on the device.
    pub fn is_present(self) -> bool {
        matches!(self, Self::Active | Self::Pending)
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Pending => write!(f, "pending"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "removed" => Ok(Self::Removed),
            _ => Err(format!("Invalid enrollment status: {s}")),
        }
    }
}

/// One employee-card pairing, currently or previously valid.
///
/// At most one `Active` assignment may exist per distinct card value; the
/// repository rejects violations at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardAssignment {
    /// Stable record identifier.
    pub id: AssignmentId,
    /// Stable business key of the employee.
    pub employee_id: String,
    /// Optional display name, propagated to devices on enrollment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    /// Canonical fixed-width uppercase hex card data.
    pub card_data: String,
    /// Credential technology.
    pub card_type: CardType,
    /// On-device encoding format.
    pub card_format: i32,
    /// On-device encoding size in bits.
    pub card_size: i32,
    /// Lifecycle status.
    pub status: AssignmentStatus,
    /// When the assignment was created.
    pub assigned_at: DateTime<Utc>,
    /// When the assignment was revoked, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    /// Operator notes (revocation reasons are appended here).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CardAssignment {
    /// Create a new active assignment.
    pub fn new(
        employee_id: impl Into<String>,
        card_data: impl Into<String>,
        card_type: CardType,
    ) -> Self {
        Self {
            id: AssignmentId::new(),
            employee_id: employee_id.into(),
            employee_name: None,
            card_data: card_data.into(),
            card_type,
            card_format: 0,
            card_size: 0,
            status: AssignmentStatus::Active,
            assigned_at: Utc::now(),
            revoked_at: None,
            notes: None,
        }
    }

    /// Set the employee display name.
    #[must_use]
    pub fn with_employee_name(mut self, name: impl Into<String>) -> Self {
        self.employee_name = Some(name.into());
        self
    }

    /// Set the on-device encoding.
    #[must_use]
    pub fn with_encoding(mut self, format: i32, size: i32) -> Self {
        self.card_format = format;
        self.card_size = size;
        self
    }

    /// Whether this assignment must be present on devices.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Last known projection of one assignment onto one device.
///
/// Unique on (`device_id`, `assignment_id`) and on
/// (`device_id`, `device_user_id`) among non-removed rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEnrollment {
    /// Device the assignment is projected onto.
    pub device_id: DeviceId,
    /// The projected assignment.
    pub assignment_id: AssignmentId,
    /// Identifier used on the device (normally the employee ID).
    pub device_user_id: String,
    /// Projection status.
    pub status: EnrollmentStatus,
    /// When the projection was first created.
    pub enrolled_at: DateTime<Utc>,
    /// When the row was last touched by a reconciliation pass.
    pub last_sync_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_type_round_trip() {
        for t in [
            CardType::Csn,
            CardType::Secure,
            CardType::Access,
            CardType::Wiegand,
            CardType::Qr,
        ] {
            assert_eq!(t.to_string().parse::<CardType>().unwrap(), t);
        }
        assert!("magstripe".parse::<CardType>().is_err());
    }

    #[test]
    fn test_status_classification() {
        assert!(AssignmentStatus::Active.is_active());
        assert!(!AssignmentStatus::Revoked.is_active());
        assert!(!AssignmentStatus::Lost.is_active());
        assert!(!AssignmentStatus::Expired.is_active());

        assert!(EnrollmentStatus::Active.is_present());
        assert!(EnrollmentStatus::Pending.is_present());
        assert!(!EnrollmentStatus::Removed.is_present());
    }

    #[test]
    fn test_enum_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&AssignmentStatus::Revoked).unwrap(),
            "\"revoked\""
        );
        assert_eq!(
            serde_json::to_string(&CardType::Wiegand).unwrap(),
            "\"wiegand\""
        );
    }

    #[test]
    fn test_assignment_builder() {
        let assignment = CardAssignment::new("emp1", "AABBCC", CardType::Csn)
            .with_employee_name("Alex Chen")
            .with_encoding(26, 34);

        assert!(assignment.is_active());
        assert_eq!(assignment.employee_name.as_deref(), Some("Alex Chen"));
        assert_eq!(assignment.card_format, 26);
        assert_eq!(assignment.card_size, 34);
        assert!(assignment.revoked_at.is_none());
    }
}
