pub mod approvals;
pub mod devices;
pub mod error;
pub mod events;
pub mod pairing;
pub mod policy;

pub use approvals::{ApprovalEngine, ApprovalStats, BatchItemOutcome, CreateOutcome, ResolveOptions};
pub use devices::{DeviceRegistry, IssuedDevice};
pub use error::ServiceError;
pub use events::{DaemonEvent, EventBus};
pub use pairing::{PairingConfig, PairingCoordinator, PairingGrant};
pub use policy::PolicySet;
