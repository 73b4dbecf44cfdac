//! Narrow persistence seam for the daemon core.
//!
//! The core never embeds storage logic; it talks to these traits and treats
//! their failures as recoverable 500-class errors. The bundled
//! [`MemoryStore`] is the single-machine default; durable backends live
//! behind the same interface.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{ApprovalRequest, ApprovalStatus, Device};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Approval is not pending")]
    NotPending,

    #[error("Storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn create(&self, device: Device) -> Result<Device, RepositoryError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Device>, RepositoryError>;
    async fn find_all(&self) -> Result<Vec<Device>, RepositoryError>;
    /// Monotonic: a stale `at` never moves `last_seen_at` backwards.
    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError>;
    /// Irreversible soft delete.
    async fn revoke(&self, id: &str) -> Result<Device, RepositoryError>;
}

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn create(&self, request: ApprovalRequest) -> Result<ApprovalRequest, RepositoryError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<ApprovalRequest>, RepositoryError>;
    async fn find_all(&self) -> Result<Vec<ApprovalRequest>, RepositoryError>;
    async fn find_pending(&self) -> Result<Vec<ApprovalRequest>, RepositoryError>;
    /// Guarded compare-and-set: transitions `pending` to the given terminal
    /// status, stamping `resolved_at` and merging `resolution` into the
    /// payload. Fails with [`RepositoryError::NotPending`] when the request
    /// already reached a terminal state, so concurrent resolution and
    /// expiration have exactly one winner.
    async fn resolve(
        &self,
        id: &str,
        status: ApprovalStatus,
        resolved_at: DateTime<Utc>,
        resolution: Option<serde_json::Value>,
    ) -> Result<ApprovalRequest, RepositoryError>;
}
