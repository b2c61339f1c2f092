//! Instance Controller (C2).

mod controller;
mod lock;

pub use controller::InstanceController;
pub use lock::InstanceLock;
