pub mod approval;
pub mod device;
pub mod pairing;

pub use approval::{ApprovalAction, ApprovalRequest, ApprovalStatus, ApprovalType};
pub use device::Device;
pub use pairing::{PairingToken, TokenPurpose};
