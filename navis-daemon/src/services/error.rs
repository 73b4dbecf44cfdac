use navis_core::error::AppError;
use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Approval not found")]
    ApprovalNotFound,

    #[error("Approval already resolved")]
    ApprovalNotPending,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Invalid pairing token")]
    InvalidPairingToken,

    #[error("Pairing token expired")]
    PairingTokenExpired,

    #[error("Pairing request denied")]
    PairingDenied,

    #[error("Pairing request timed out")]
    PairingTimedOut,

    #[error("Storage failure: {0}")]
    Repository(RepositoryError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RepositoryError> for ServiceError {
    // NotFound/NotPending get classified by the call site when the entity is
    // known; a raw passthrough is treated as a storage-layer failure.
    fn from(err: RepositoryError) -> Self {
        ServiceError::Repository(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ApprovalNotFound => {
                AppError::NotFound(anyhow::anyhow!("Approval not found"))
            }
            ServiceError::ApprovalNotPending => {
                AppError::Conflict(anyhow::anyhow!("Approval already resolved"))
            }
            ServiceError::DeviceNotFound => {
                AppError::NotFound(anyhow::anyhow!("Device not found"))
            }
            ServiceError::InvalidPairingToken => {
                AppError::BadRequest(anyhow::anyhow!("Invalid pairing token"))
            }
            ServiceError::PairingTokenExpired => {
                AppError::BadRequest(anyhow::anyhow!("Pairing token expired"))
            }
            ServiceError::PairingDenied => {
                AppError::Forbidden(anyhow::anyhow!("Pairing request denied"))
            }
            ServiceError::PairingTimedOut => {
                AppError::RequestTimeout("Pairing request timed out".to_string())
            }
            ServiceError::Repository(e) => AppError::StorageError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
