use std::time::Duration;

use crate::provider::ProviderError;

/// Byte channel to a device. Implementations wrap a serial port, a socket
/// or a test double.
pub trait DeviceTransport: Send {
    fn is_connected(&self) -> bool;

    fn connect(&mut self) -> Result<(), ProviderError>;

    fn disconnect(&mut self);

    /// Send one request line and wait up to `timeout` for the reply line.
    fn exchange(&mut self, request: &str, timeout: Duration) -> Result<String, ProviderError>;
}
