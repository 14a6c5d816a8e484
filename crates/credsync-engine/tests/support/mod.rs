//! Shared test fixtures: an in-memory device fleet with failure injection.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use credsync_connector::{
    CardWrite, DeviceClient, DeviceDirectory, DeviceEndpoint, DeviceError, DeviceId,
    DeviceResult, DeviceUser, EnrollRequest,
};

/// In-memory device fleet. Serves as both the capability client and the
/// directory, with hooks to inject failures.
#[derive(Default)]
pub struct MockFleet {
    users: Mutex<HashMap<DeviceId, HashMap<String, DeviceUser>>>,
    fail_enroll: Mutex<HashSet<String>>,
    unavailable: Mutex<HashSet<DeviceId>>,
    ghost_listings: Mutex<HashMap<DeviceId, Vec<DeviceUser>>>,
    list_latency: Mutex<Option<Duration>>,
}

impl MockFleet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make a device known to the fleet (and the directory).
    pub fn register(&self, device_id: DeviceId) {
        self.users.lock().unwrap().entry(device_id).or_default();
    }

    /// Preload a user directly into device state.
    pub fn seed_user(&self, device_id: DeviceId, user: DeviceUser) {
        self.users
            .lock()
            .unwrap()
            .entry(device_id)
            .or_default()
            .insert(user.id.clone(), user);
    }

    /// Every enroll attempt for this user ID fails.
    pub fn fail_enroll_for(&self, user_id: impl Into<String>) {
        self.fail_enroll.lock().unwrap().insert(user_id.into());
    }

    /// Listing this device fails with `Unavailable`.
    pub fn set_unavailable(&self, device_id: DeviceId) {
        self.unavailable.lock().unwrap().insert(device_id);
    }

    /// Make the listing report a user that is not actually in device
    /// state, so the card write hits `NotFound`.
    pub fn add_ghost_listing(&self, device_id: DeviceId, user: DeviceUser) {
        self.ghost_listings
            .lock()
            .unwrap()
            .entry(device_id)
            .or_default()
            .push(user);
    }

    /// Delay every listing call (for timeout tests).
    pub fn set_list_latency(&self, latency: Duration) {
        *self.list_latency.lock().unwrap() = Some(latency);
    }

    pub fn has_user(&self, device_id: DeviceId, user_id: &str) -> bool {
        self.users
            .lock()
            .unwrap()
            .get(&device_id)
            .is_some_and(|users| users.contains_key(user_id))
    }

    pub fn card_of(&self, device_id: DeviceId, user_id: &str) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .get(&device_id)
            .and_then(|users| users.get(user_id))
            .and_then(|user| user.card_data.clone())
    }

    /// Remove a user from device state without going through the client,
    /// simulating out-of-band edits at the device keypad.
    pub fn delete_direct(&self, device_id: DeviceId, user_id: &str) {
        if let Some(users) = self.users.lock().unwrap().get_mut(&device_id) {
            users.remove(user_id);
        }
    }

    pub fn user_count(&self, device_id: DeviceId) -> usize {
        self.users
            .lock()
            .unwrap()
            .get(&device_id)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl DeviceClient for MockFleet {
    async fn list_users(&self, device_id: DeviceId) -> DeviceResult<Vec<DeviceUser>> {
        let latency = *self.list_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.unavailable.lock().unwrap().contains(&device_id) {
            return Err(DeviceError::unavailable("connection lost"));
        }

        let mut listing: Vec<DeviceUser> = self
            .users
            .lock()
            .unwrap()
            .get(&device_id)
            .map(|users| users.values().cloned().collect())
            .unwrap_or_default();
        if let Some(ghosts) = self.ghost_listings.lock().unwrap().get(&device_id) {
            listing.extend(ghosts.iter().cloned());
        }
        Ok(listing)
    }

    async fn enroll_users(
        &self,
        device_id: DeviceId,
        users: &[EnrollRequest],
    ) -> DeviceResult<()> {
        for request in users {
            if self.fail_enroll.lock().unwrap().contains(&request.id) {
                return Err(DeviceError::protocol("injected enroll failure"));
            }
            self.users
                .lock()
                .unwrap()
                .entry(device_id)
                .or_default()
                .insert(request.id.clone(), DeviceUser::without_card(&request.id));
        }
        Ok(())
    }

    async fn set_user_cards(
        &self,
        device_id: DeviceId,
        cards: &[CardWrite],
    ) -> DeviceResult<()> {
        let mut state = self.users.lock().unwrap();
        let users = state.entry(device_id).or_default();
        for card in cards {
            match users.get_mut(&card.user_id) {
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
        device_id: DeviceId,
        user_ids: &[String],
    ) -> DeviceResult<()> {
        let mut state = self.users.lock().unwrap();
        if let Some(users) = state.get_mut(&device_id) {
            for id in user_ids {
                users.remove(id);
            }
        }
        self.ghost_listings
            .lock()
            .unwrap()
            .entry(device_id)
            .or_default()
            .retain(|ghost| !user_ids.contains(&ghost.id));
        Ok(())
    }
}

#[async_trait]
impl DeviceDirectory for MockFleet {
    async fn connected_devices(&self) -> DeviceResult<Vec<DeviceEndpoint>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .keys()
            .map(|device_id| DeviceEndpoint {
                device_id: *device_id,
                ip: "10.0.0.1".parse().unwrap(),
                port: 4370,
            })
            .collect())
    }
}
