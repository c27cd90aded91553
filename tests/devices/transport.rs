use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use datarepo::provider::device::DeviceTransport;
use datarepo::ProviderError;

/// Transport that answers from a fixed list of reply lines and keeps every
/// request it was sent. Running out of replies is a transport failure.
pub struct ScriptedPort {
    connected: bool,
    replies: VecDeque<String>,
    sent: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl ScriptedPort {
    pub fn new(replies: &[&str]) -> (Self, Arc<Mutex<Vec<serde_json::Value>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let port = Self {
            connected: false,
            replies: replies.iter().map(|reply| reply.to_string()).collect(),
            sent: Arc::clone(&sent),
        };
        (port, sent)
    }
}

impl DeviceTransport for ScriptedPort {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), ProviderError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn exchange(&mut self, request: &str, _timeout: Duration) -> Result<String, ProviderError> {
        self.sent
            .lock()
            .unwrap()
            .push(serde_json::from_str(request).unwrap());
        self.replies.pop_front().ok_or_else(|| ProviderError::Device {
            port: "scripted".to_string(),
            message: "no reply".to_string(),
        })
    }
}
