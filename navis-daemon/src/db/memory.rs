use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{ApprovalRepository, DeviceRepository, RepositoryError};
use crate::models::{ApprovalRequest, ApprovalStatus, Device};

/// In-memory store with a single-writer-at-a-time discipline per map.
/// Readers never observe a half-written record; all mutations happen under
/// the write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    devices: RwLock<HashMap<String, Device>>,
    approvals: RwLock<HashMap<String, ApprovalRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn devices_read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Device>>, RepositoryError> {
        self.devices
            .read()
            .map_err(|_| RepositoryError::Storage(anyhow::anyhow!("device store poisoned")))
    }

    fn devices_write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Device>>, RepositoryError> {
        self.devices
            .write()
            .map_err(|_| RepositoryError::Storage(anyhow::anyhow!("device store poisoned")))
    }

    fn approvals_read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, ApprovalRequest>>, RepositoryError> {
        self.approvals
            .read()
            .map_err(|_| RepositoryError::Storage(anyhow::anyhow!("approval store poisoned")))
    }

    fn approvals_write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, ApprovalRequest>>, RepositoryError> {
        self.approvals
            .write()
            .map_err(|_| RepositoryError::Storage(anyhow::anyhow!("approval store poisoned")))
    }
}

#[async_trait]
impl DeviceRepository for MemoryStore {
    async fn create(&self, device: Device) -> Result<Device, RepositoryError> {
        let mut devices = self.devices_write()?;
        devices.insert(device.id.clone(), device.clone());
        Ok(device)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Device>, RepositoryError> {
        Ok(self.devices_read()?.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Device>, RepositoryError> {
        let mut all: Vec<Device> = self.devices_read()?.values().cloned().collect();
        all.sort_by(|a, b| a.paired_at.cmp(&b.paired_at));
        Ok(all)
    }

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut devices = self.devices_write()?;
        let device = devices.get_mut(id).ok_or(RepositoryError::NotFound)?;
        // monotonic max, never a blind overwrite
        if at > device.last_seen_at {
            device.last_seen_at = at;
        }
        Ok(())
    }

    async fn revoke(&self, id: &str) -> Result<Device, RepositoryError> {
        let mut devices = self.devices_write()?;
        let device = devices.get_mut(id).ok_or(RepositoryError::NotFound)?;
        device.revoked = true;
        Ok(device.clone())
    }
}

#[async_trait]
impl ApprovalRepository for MemoryStore {
    async fn create(&self, request: ApprovalRequest) -> Result<ApprovalRequest, RepositoryError> {
        let mut approvals = self.approvals_write()?;
        approvals.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ApprovalRequest>, RepositoryError> {
        Ok(self.approvals_read()?.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let mut all: Vec<ApprovalRequest> = self.approvals_read()?.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn find_pending(&self) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let mut pending: Vec<ApprovalRequest> = self
            .approvals_read()?
            .values()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    async fn resolve(
        &self,
        id: &str,
        status: ApprovalStatus,
        resolved_at: DateTime<Utc>,
        resolution: Option<serde_json::Value>,
    ) -> Result<ApprovalRequest, RepositoryError> {
        let mut approvals = self.approvals_write()?;
        let request = approvals.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if !request.is_pending() {
            return Err(RepositoryError::NotPending);
        }
        request.status = status;
        request.resolved_at = Some(resolved_at);
        if let Some(resolution) = resolution {
            if let Some(payload) = request.payload.as_object_mut() {
                payload.insert("resolution".to_string(), resolution);
            } else {
                // non-object payloads survive the merge under "value"
                let original = request.payload.take();
                request.payload = serde_json::json!({
                    "value": original,
                    "resolution": resolution,
                });
            }
        }
        Ok(request.clone())
    }
}
