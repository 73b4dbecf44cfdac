pub mod approvals;
pub mod devices;
pub mod pairing;
