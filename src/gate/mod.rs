//! Per-port exclusive gates.
//!
//! A device port serves one exchange at a time. Callers obtain the port's
//! [`PortLock`] from a [`PortLockManager`] and hold a [`PortGuard`] for the
//! duration of the exchange.

mod manager;
mod port_lock;

use std::time::Duration;

use thiserror::Error;

pub use manager::PortLockManager;
pub use port_lock::{PortGuard, PortLock};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// A thread panicked while holding the gate's state.
    #[error("gate poisoned: {0}")]
    Poisoned(String),

    /// The gate stayed held for the whole wait.
    #[error("gate still held after {0:?}")]
    Busy(Duration),
}
