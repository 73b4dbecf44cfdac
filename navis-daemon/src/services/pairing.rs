//! Pairing coordinator: turns a short-lived token plus a human approval into
//! a trusted device credential.
//!
//! Tokens are single-use. A device presents one, the coordinator raises a
//! pairing approval, and the caller's HTTP request blocks until a human
//! decides or the hard wait deadline passes.

use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use serde::Serialize;
use std::time::Duration;
use utoipa::ToSchema;

use crate::models::{ApprovalStatus, ApprovalType, PairingToken, TokenPurpose};
use crate::services::approvals::{ApprovalEngine, CreateOutcome};
use crate::services::devices::DeviceRegistry;
use crate::services::error::ServiceError;

const TOKEN_LEN_BYTES: usize = 16;

#[derive(Debug, Clone)]
pub struct PairingConfig {
    pub qr_token_ttl: Duration,
    pub manual_token_ttl: Duration,
    /// Hard ceiling on how long a pairing request may block, regardless of
    /// approval policy timeouts.
    pub wait_timeout: Duration,
    pub api_base_url: String,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            qr_token_ttl: Duration::from_secs(300),
            manual_token_ttl: Duration::from_secs(600),
            wait_timeout: Duration::from_secs(120),
            api_base_url: "http://localhost:7420".to_string(),
        }
    }
}

/// The one-time credential bundle handed to a freshly approved device. The
/// secret appears here and nowhere else.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PairingGrant {
    pub device_id: String,
    pub device_secret: String,
    pub device_name: String,
    pub api_base_url: String,
}

#[derive(Clone)]
pub struct PairingCoordinator {
    config: PairingConfig,
    tokens: std::sync::Arc<DashMap<String, PairingToken>>,
    engine: ApprovalEngine,
    registry: DeviceRegistry,
}

impl PairingCoordinator {
    pub fn new(config: PairingConfig, engine: ApprovalEngine, registry: DeviceRegistry) -> Self {
        Self {
            config,
            tokens: std::sync::Arc::new(DashMap::new()),
            engine,
            registry,
        }
    }

    pub fn config(&self) -> &PairingConfig {
        &self.config
    }

    /// Mint a fresh token for the given channel. Expired tokens are swept
    /// opportunistically on every issuance.
    pub fn issue_token(&self, purpose: TokenPurpose) -> PairingToken {
        let now = Utc::now();
        self.tokens.retain(|_, t| !t.is_expired(now));

        let mut bytes = [0u8; TOKEN_LEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let value = hex::encode_upper(bytes);

        let ttl = match purpose {
            TokenPurpose::Qr => self.config.qr_token_ttl,
            TokenPurpose::Manual => self.config.manual_token_ttl,
        };
        let token = PairingToken {
            token: value.clone(),
            purpose,
            created_at: now,
            expires_at: now + ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::zero()),
        };
        self.tokens.insert(value, token.clone());

        tracing::debug!(purpose = %purpose, "Issued pairing token");
        token
    }

    /// Redeem a token: raise a pairing approval and block until a human
    /// decides or the wait deadline passes. On approval the token is
    /// consumed and a new device credential is minted.
    pub async fn begin_pairing(
        &self,
        token: &str,
        device_name: &str,
        device_info: Option<serde_json::Value>,
    ) -> Result<PairingGrant, ServiceError> {
        let presented = self
            .tokens
            .get(token)
            .map(|entry| entry.clone())
            .ok_or(ServiceError::InvalidPairingToken)?;

        if presented.is_expired(Utc::now()) {
            self.tokens.remove(token);
            return Err(ServiceError::PairingTokenExpired);
        }

        let outcome = self
            .engine
            .create_approval(
                ApprovalType::Pairing,
                serde_json::json!({
                    "token": token,
                    "device_name": device_name,
                    "purpose": presented.purpose,
                    "device_info": device_info,
                }),
                None,
                None,
                Some(self.wait_deadline()),
            )
            .await?;

        let request = match outcome {
            CreateOutcome::Pending(request) => request,
            // pairing is never auto-approvable under any shipped policy
            CreateOutcome::AutoApproved(request) => request,
        };

        if !request.is_pending() {
            return self.grant(token, device_name).await;
        }

        let rx = self.engine.wait_for_resolution(&request.id).await?;
        let resolved = match tokio::time::timeout(self.config.wait_timeout, rx).await {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(_)) | Err(_) => {
                // waiter dropped or hard deadline hit; burn the token so a
                // stalled request cannot be replayed later
                self.engine.cancel_wait(&request.id);
                self.tokens.remove(token);
                tracing::warn!(approval_id = %request.id, "Pairing wait timed out");
                return Err(ServiceError::PairingTimedOut);
            }
        };

        match resolved.status {
            ApprovalStatus::Approved => self.grant(token, device_name).await,
            ApprovalStatus::Denied => {
                tracing::info!(approval_id = %request.id, "Pairing denied");
                Err(ServiceError::PairingDenied)
            }
            ApprovalStatus::Expired => {
                self.tokens.remove(token);
                Err(ServiceError::PairingTimedOut)
            }
            ApprovalStatus::Pending => Err(ServiceError::Internal(anyhow::anyhow!(
                "resolution delivered a pending approval"
            ))),
        }
    }

    async fn grant(&self, token: &str, device_name: &str) -> Result<PairingGrant, ServiceError> {
        // Removing the token is the single-use gate: of several redemptions
        // racing on the same token, only the one that takes it out of the
        // map may mint a device.
        if self.tokens.remove(token).is_none() {
            return Err(ServiceError::InvalidPairingToken);
        }
        let issued = self.registry.issue(device_name).await?;
        Ok(PairingGrant {
            device_id: issued.device.id,
            device_secret: issued.raw_secret,
            device_name: issued.device.display_name,
            api_base_url: self.config.api_base_url.clone(),
        })
    }

    /// The approval record must not outlive the caller's wait by much, so
    /// its timer tracks the wait deadline with a small grace margin.
    fn wait_deadline(&self) -> Duration {
        self.config.wait_timeout + Duration::from_secs(5)
    }

    pub fn active_token_count(&self) -> usize {
        let now = Utc::now();
        self.tokens.iter().filter(|t| !t.is_expired(now)).count()
    }
}
