//! Serial-port style devices exposed as a data provider.
//!
//! Every call is one JSON request line and one JSON reply line over a
//! [`DeviceTransport`]. Calls to the same port are serialized through a
//! shared [`PortLockManager`](crate::gate::PortLockManager) gate.

mod provider;
mod transport;

pub use provider::DeviceProvider;
pub use transport::DeviceTransport;
