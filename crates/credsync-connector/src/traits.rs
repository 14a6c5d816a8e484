//! Device capability traits
//!
//! Capability-based contract between the reconciliation engine and whatever
//! transport actually speaks to the devices. The engine is protocol-agnostic:
//! it only ever sees these traits.

use async_trait::async_trait;

use crate::error::DeviceResult;
use crate::ids::DeviceId;
use crate::types::{CardWrite, DeviceEndpoint, DeviceUser, EnrollRequest};

/// Per-device user and card operations.
///
/// A device's session is a stateful, non-reentrant resource: callers must
/// serialize operations against a single device. Calls for different
/// devices may run concurrently.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// List every user currently enrolled on the device, with card state.
    async fn list_users(&self, device_id: DeviceId) -> DeviceResult<Vec<DeviceUser>>;

    /// Create users on the device. Creating does not assign a card; follow
    /// up with [`set_user_cards`](Self::set_user_cards).
    async fn enroll_users(
        &self,
        device_id: DeviceId,
        users: &[EnrollRequest],
    ) -> DeviceResult<()>;

    /// Write cards onto already-enrolled users.
    ///
    /// Fails with [`DeviceError::NotFound`](crate::DeviceError::NotFound) if
    /// a user ID is absent on the device.
    async fn set_user_cards(&self, device_id: DeviceId, cards: &[CardWrite]) -> DeviceResult<()>;

    /// Delete users from the device.
    async fn delete_users(&self, device_id: DeviceId, user_ids: &[String]) -> DeviceResult<()>;
}

/// Directory of currently connected devices.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Enumerate devices that are currently reachable.
    async fn connected_devices(&self) -> DeviceResult<Vec<DeviceEndpoint>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Minimal in-memory device used to exercise the trait contract.
    struct FakeDevice {
        users: Mutex<HashMap<String, DeviceUser>>,
    }

    impl FakeDevice {
        fn new() -> Self {
            Self {
                users: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl DeviceClient for FakeDevice {
        async fn list_users(&self, _device_id: DeviceId) -> DeviceResult<Vec<DeviceUser>> {
            Ok(self.users.lock().unwrap().values().cloned().collect())
        }

        async fn enroll_users(
            &self,
            _device_id: DeviceId,
            users: &[EnrollRequest],
        ) -> DeviceResult<()> {
            let mut state = self.users.lock().unwrap();
            for user in users {
                state.insert(user.id.clone(), DeviceUser::without_card(&user.id));
            }
            Ok(())
        }

        async fn set_user_cards(
            &self,
            _device_id: DeviceId,
            cards: &[CardWrite],
        ) -> DeviceResult<()> {
            let mut state = self.users.lock().unwrap();
            for card in cards {
                match state.get_mut(&card.user_id) {
                    Some(user) => {
                        user.has_card = true;
                        user.card_data = Some(card.card_data.clone());
                    }
                    None => return Err(DeviceError::not_found(&card.user_id)),
                }
            }
            Ok(())
        }

        async fn delete_users(
            &self,
            _device_id: DeviceId,
            user_ids: &[String],
        ) -> DeviceResult<()> {
            let mut state = self.users.lock().unwrap();
            for id in user_ids {
                state.remove(id);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_enroll_then_set_card() {
        let device = FakeDevice::new();
        let id = DeviceId::new();

        device
            .enroll_users(id, &[EnrollRequest::new("emp1", None)])
            .await
            .unwrap();
        device
            .set_user_cards(id, &[CardWrite::new("emp1", "AABBCC")])
            .await
            .unwrap();

        let users = device.list_users(id).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].card_data.as_deref(), Some("AABBCC"));
    }

    #[tokio::test]
    async fn test_set_card_on_missing_user_is_not_found() {
        let device = FakeDevice::new();
        let err = device
            .set_user_cards(DeviceId::new(), &[CardWrite::new("ghost", "AABBCC")])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
