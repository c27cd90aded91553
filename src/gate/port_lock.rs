use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::GateError;

/// Exclusive flag backed by `Mutex<bool>` + `Condvar`.
pub struct PortLock {
    state: Mutex<bool>,
    wake: Condvar,
}

impl PortLock {
    pub fn new() -> Self {
        PortLock {
            state: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    /// Block until the gate is free, then take it.
    pub fn lock(&self) -> Result<(), GateError> {
        let mut locked = self
            .state
            .lock()
            .map_err(|e| GateError::Poisoned(e.to_string()))?;
        while *locked {
            locked = self
                .wake
                .wait(locked)
                .map_err(|e| GateError::Poisoned(e.to_string()))?;
        }
        *locked = true;
        Ok(())
    }

    /// `Ok(true)` if taken, `Ok(false)` if already held.
    pub fn try_lock(&self) -> Result<bool, GateError> {
        let mut locked = self
            .state
            .lock()
            .map_err(|e| GateError::Poisoned(e.to_string()))?;
        if *locked {
            Ok(false)
        } else {
            *locked = true;
            Ok(true)
        }
    }

    pub fn unlock(&self) -> Result<(), GateError> {
        let mut locked = self
            .state
            .lock()
            .map_err(|e| GateError::Poisoned(e.to_string()))?;
        if *locked {
            *locked = false;
            self.wake.notify_one();
        }
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().map(|locked| *locked).unwrap_or(true)
    }

    /// Poll [`try_lock`](Self::try_lock) every `poll` until it succeeds or
    /// `wait` has elapsed. A zero `wait` tries exactly once.
    pub fn acquire_within(&self, wait: Duration, poll: Duration) -> Result<PortGuard<'_>, GateError> {
        let started = Instant::now();
        loop {
            if self.try_lock()? {
                return Ok(PortGuard { lock: self });
            }
            let elapsed = started.elapsed();
            if elapsed >= wait {
                return Err(GateError::Busy(elapsed));
            }
            thread::sleep(poll.min(wait - elapsed).max(Duration::from_millis(1)));
        }
    }
}

impl Default for PortLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases its gate when dropped.
pub struct PortGuard<'a> {
    lock: &'a PortLock,
}

impl Drop for PortGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.unlock();
    }
}
