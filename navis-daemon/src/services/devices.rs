//! Device registry: mints credentials at pairing time and manages the
//! device lifecycle afterwards.

use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{DeviceRepository, RepositoryError};
use crate::models::Device;
use crate::services::error::ServiceError;
use crate::services::events::{DaemonEvent, EventBus};

const SECRET_LEN_BYTES: usize = 32;

/// A freshly minted device together with the one-time raw secret. The raw
/// secret exists only in this value and in the pairing response that carries
/// it to the device; the registry keeps it server-side for verification but
/// never serializes it again.
#[derive(Debug, Clone)]
pub struct IssuedDevice {
    pub device: Device,
    pub raw_secret: String,
}

#[derive(Clone)]
pub struct DeviceRegistry {
    repo: Arc<dyn DeviceRepository>,
    events: EventBus,
}

impl DeviceRegistry {
    pub fn new(repo: Arc<dyn DeviceRepository>, events: EventBus) -> Self {
        Self { repo, events }
    }

    /// Mint a new trusted device with a random 256-bit signing secret.
    pub async fn issue(&self, display_name: &str) -> Result<IssuedDevice, ServiceError> {
        let mut secret_bytes = [0u8; SECRET_LEN_BYTES];
        rand::thread_rng().fill_bytes(&mut secret_bytes);
        let raw_secret = hex::encode(secret_bytes);
        let secret_digest = hex::encode(Sha256::digest(raw_secret.as_bytes()));

        let device = Device::new(
            Uuid::new_v4().to_string(),
            display_name.to_string(),
            raw_secret.clone(),
            secret_digest,
        );
        let device = self.repo.create(device).await?;

        tracing::info!(device_id = %device.id, "Paired new device");
        self.events.publish(DaemonEvent::DevicePaired(device.clone()));

        Ok(IssuedDevice { device, raw_secret })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Device>, ServiceError> {
        Ok(self.repo.find_by_id(id).await?)
    }

    pub async fn find_all(&self) -> Result<Vec<Device>, ServiceError> {
        Ok(self.repo.find_all().await?)
    }

    /// Devices still trusted for signing.
    pub async fn find_active(&self) -> Result<Vec<Device>, ServiceError> {
        let mut devices = self.repo.find_all().await?;
        devices.retain(|d| !d.revoked);
        Ok(devices)
    }

    pub async fn touch_last_seen(&self, id: &str) -> Result<(), ServiceError> {
        match self.repo.touch_last_seen(id, Utc::now()).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(ServiceError::DeviceNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Revoke trust. Future signed requests from this device fail with a
    /// revocation error; the record stays for audit.
    pub async fn revoke(&self, id: &str) -> Result<Device, ServiceError> {
        let device = match self.repo.revoke(id).await {
            Ok(device) => device,
            Err(RepositoryError::NotFound) => return Err(ServiceError::DeviceNotFound),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(device_id = %device.id, "Revoked device");
        self.events.publish(DaemonEvent::DeviceRevoked(device.clone()));

        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(Arc::new(MemoryStore::new()), EventBus::new())
    }

    #[tokio::test]
    async fn test_issue_mints_unique_secrets() {
        let registry = registry();
        let a = registry.issue("Phone A").await.unwrap();
        let b = registry.issue("Phone B").await.unwrap();

        assert_ne!(a.device.id, b.device.id);
        assert_ne!(a.raw_secret, b.raw_secret);
        assert_eq!(a.raw_secret.len(), SECRET_LEN_BYTES * 2);
        // the stored digest is a fingerprint, never the key itself
        assert_ne!(a.device.secret_digest, a.raw_secret);
        assert_eq!(
            a.device.secret_digest,
            hex::encode(Sha256::digest(a.raw_secret.as_bytes()))
        );
    }

    #[tokio::test]
    async fn test_issue_publishes_paired_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let registry = DeviceRegistry::new(Arc::new(MemoryStore::new()), bus);

        let issued = registry.issue("Phone").await.unwrap();
        match rx.recv().await.unwrap() {
            DaemonEvent::DevicePaired(device) => assert_eq!(device.id, issued.device.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_revoke_flags_device_and_publishes() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let registry = DeviceRegistry::new(Arc::new(MemoryStore::new()), bus);

        let issued = registry.issue("Phone").await.unwrap();
        rx.recv().await.unwrap(); // paired

        let revoked = registry.revoke(&issued.device.id).await.unwrap();
        assert!(revoked.revoked);

        match rx.recv().await.unwrap() {
            DaemonEvent::DeviceRevoked(device) => assert!(device.revoked),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_revoke_unknown_device() {
        let registry = registry();
        let err = registry.revoke("ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::DeviceNotFound));
    }
}
