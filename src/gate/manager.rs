use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{GateError, PortLock};

/// Lazily creates one [`PortLock`] per port name and hands out the same
/// `Arc` for repeated lookups.
pub struct PortLockManager {
    locks: Mutex<HashMap<String, Arc<PortLock>>>,
}

impl PortLockManager {
    pub fn new() -> Self {
        PortLockManager {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_lock(&self, port: &str) -> Result<Arc<PortLock>, GateError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| GateError::Poisoned("port lock map poisoned".into()))?;
        Ok(locks
            .entry(port.to_string())
            .or_insert_with(|| Arc::new(PortLock::new()))
            .clone())
    }
}

impl Default for PortLockManager {
    fn default() -> Self {
        Self::new()
    }
}
