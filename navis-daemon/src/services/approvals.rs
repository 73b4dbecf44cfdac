//! Approval engine: the human-in-the-loop gate for privileged operations.
//!
//! Every pending request carries a cancellable expiration timer. Resolution
//! and expiration race through the repository's guarded compare-and-set, so
//! exactly one of them wins; the loser is an idempotent no-op.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::db::{ApprovalRepository, RepositoryError};
use crate::models::{ApprovalAction, ApprovalRequest, ApprovalStatus, ApprovalType};
use crate::services::error::ServiceError;
use crate::services::events::{DaemonEvent, EventBus};
use crate::services::policy::PolicySet;

/// What `create_approval` decided about a request.
#[derive(Debug)]
pub enum CreateOutcome {
    /// Policy waved the request through; the record is synthetic and was
    /// never persisted or announced.
    AutoApproved(ApprovalRequest),
    /// Persisted, announced, and awaiting a human (or the timer).
    Pending(ApprovalRequest),
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub user_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug)]
pub struct BatchItemOutcome {
    pub id: String,
    pub outcome: Result<ApprovalRequest, ServiceError>,
}

#[derive(Debug, Clone, Default, serde::Serialize, utoipa::ToSchema)]
pub struct ApprovalStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
    pub expired: usize,
    pub by_type: std::collections::HashMap<String, usize>,
}

struct EngineInner {
    repo: Arc<dyn ApprovalRepository>,
    policies: PolicySet,
    events: EventBus,
    waiters: DashMap<String, oneshot::Sender<ApprovalRequest>>,
    timers: DashMap<String, JoinHandle<()>>,
}

#[derive(Clone)]
pub struct ApprovalEngine {
    inner: Arc<EngineInner>,
}

impl ApprovalEngine {
    pub fn new(repo: Arc<dyn ApprovalRepository>, policies: PolicySet, events: EventBus) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                repo,
                policies,
                events,
                waiters: DashMap::new(),
                timers: DashMap::new(),
            }),
        }
    }

    pub fn policies(&self) -> &PolicySet {
        &self.inner.policies
    }

    /// Create a request, running it through the auto-approval policy first.
    /// Pending requests get an expiration timer for the policy timeout (or
    /// the caller's override, when shorter-lived callers like pairing need
    /// their own deadline).
    pub async fn create_approval(
        &self,
        kind: ApprovalType,
        payload: serde_json::Value,
        project_id: Option<String>,
        priority: Option<i64>,
        timeout_override: Option<Duration>,
    ) -> Result<CreateOutcome, ServiceError> {
        let mut request = ApprovalRequest::new(kind, payload, project_id, priority);

        if self
            .inner
            .policies
            .evaluate_auto_approval(&request.kind, &request.payload)
        {
            request.status = ApprovalStatus::Approved;
            request.resolved_at = Some(Utc::now());
            tracing::debug!(kind = %request.kind, "Auto-approved by policy");
            return Ok(CreateOutcome::AutoApproved(request));
        }

        let timeout = timeout_override.unwrap_or_else(|| self.inner.policies.timeout_for(&request.kind));
        let request = self.inner.repo.create(request).await?;

        self.spawn_expiration_timer(request.id.clone(), timeout);
        tracing::info!(approval_id = %request.id, kind = %request.kind, "Approval requested");
        self.inner
            .events
            .publish(DaemonEvent::ApprovalRequested(request.clone()));

        Ok(CreateOutcome::Pending(request))
    }

    fn spawn_expiration_timer(&self, id: String, timeout: Duration) {
        let engine = self.clone();
        let timer_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            engine.check_expiration(&timer_id).await;
        });
        if let Some(stale) = self.inner.timers.insert(id, handle) {
            stale.abort();
        }
    }

    /// Expire a request if it is still pending. Safe to call at any time:
    /// missing and already-resolved requests are no-ops.
    pub async fn check_expiration(&self, id: &str) {
        let result = self
            .inner
            .repo
            .resolve(
                id,
                ApprovalStatus::Expired,
                Utc::now(),
                Some(serde_json::json!({"reason": "Expired"})),
            )
            .await;

        self.inner.timers.remove(id);

        match result {
            Ok(request) => {
                tracing::info!(approval_id = %id, "Approval expired");
                self.finish(request);
            }
            Err(RepositoryError::NotFound) | Err(RepositoryError::NotPending) => {}
            Err(e) => {
                tracing::error!(approval_id = %id, error = %e, "Failed to expire approval");
            }
        }
    }

    /// Apply a human decision. Loses cleanly to a concurrent expiration.
    pub async fn resolve_approval(
        &self,
        id: &str,
        action: ApprovalAction,
        options: ResolveOptions,
    ) -> Result<ApprovalRequest, ServiceError> {
        let mut resolution = serde_json::Map::new();
        if let Some(user_id) = options.user_id {
            resolution.insert("resolved_by".to_string(), serde_json::Value::String(user_id));
        }
        if let Some(reason) = options.reason {
            resolution.insert("reason".to_string(), serde_json::Value::String(reason));
        }
        let resolution = if resolution.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(resolution))
        };

        let request = match self
            .inner
            .repo
            .resolve(id, action.terminal_status(), Utc::now(), resolution)
            .await
        {
            Ok(request) => request,
            Err(RepositoryError::NotFound) => return Err(ServiceError::ApprovalNotFound),
            Err(RepositoryError::NotPending) => return Err(ServiceError::ApprovalNotPending),
            Err(e) => return Err(e.into()),
        };

        if let Some((_, timer)) = self.inner.timers.remove(id) {
            timer.abort();
        }

        tracing::info!(approval_id = %id, status = %request.status, "Approval resolved");
        self.finish(request.clone());
        Ok(request)
    }

    fn finish(&self, request: ApprovalRequest) {
        if let Some((_, waiter)) = self.inner.waiters.remove(&request.id) {
            let _ = waiter.send(request.clone());
        }
        self.inner
            .events
            .publish(DaemonEvent::ApprovalResolved(request));
    }

    /// Register for the terminal outcome of a request. The waiter slot is
    /// claimed before the status check, so a resolution landing in between
    /// still completes the returned receiver. One waiter per request; a new
    /// registration replaces the old one.
    pub async fn wait_for_resolution(
        &self,
        id: &str,
    ) -> Result<oneshot::Receiver<ApprovalRequest>, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.inner.waiters.insert(id.to_string(), tx);

        match self.inner.repo.find_by_id(id).await {
            Ok(Some(request)) if !request.is_pending() => {
                if let Some((_, waiter)) = self.inner.waiters.remove(id) {
                    let _ = waiter.send(request);
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                self.inner.waiters.remove(id);
                return Err(ServiceError::ApprovalNotFound);
            }
            Err(e) => {
                self.inner.waiters.remove(id);
                return Err(e.into());
            }
        }

        Ok(rx)
    }

    pub fn cancel_wait(&self, id: &str) {
        self.inner.waiters.remove(id);
    }

    pub async fn get_approval(&self, id: &str) -> Result<ApprovalRequest, ServiceError> {
        self.inner
            .repo
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::ApprovalNotFound)
    }

    /// Pending requests, oldest first, optionally filtered and truncated.
    pub async fn get_pending(
        &self,
        kind: Option<ApprovalType>,
        project_id: Option<String>,
        limit: Option<usize>,
    ) -> Result<Vec<ApprovalRequest>, ServiceError> {
        let mut pending = self.inner.repo.find_pending().await?;
        if let Some(kind) = kind {
            pending.retain(|r| r.kind == kind);
        }
        if let Some(project_id) = project_id {
            pending.retain(|r| r.project_id.as_deref() == Some(project_id.as_str()));
        }
        if let Some(limit) = limit {
            pending.truncate(limit);
        }
        Ok(pending)
    }

    /// Resolve several requests with one action. Failures are per-item; one
    /// already-resolved request does not abort the rest.
    pub async fn batch_resolve(
        &self,
        ids: &[String],
        action: ApprovalAction,
        options: ResolveOptions,
    ) -> Vec<BatchItemOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            let outcome = self
                .resolve_approval(id, action, options.clone())
                .await;
            outcomes.push(BatchItemOutcome {
                id: id.clone(),
                outcome,
            });
        }
        outcomes
    }

    pub async fn stats(&self) -> Result<ApprovalStats, ServiceError> {
        let all = self.inner.repo.find_all().await?;
        let mut stats = ApprovalStats {
            total: all.len(),
            ..Default::default()
        };
        for request in &all {
            match request.status {
                ApprovalStatus::Pending => stats.pending += 1,
                ApprovalStatus::Approved => stats.approved += 1,
                ApprovalStatus::Denied => stats.denied += 1,
                ApprovalStatus::Expired => stats.expired += 1,
            }
            *stats.by_type.entry(request.kind.to_string()).or_insert(0) += 1;
        }
        Ok(stats)
    }
}
