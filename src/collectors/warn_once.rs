use log::{info, warn};
use std::collections::HashSet;
use std::sync::Mutex;

/// Process-wide "already warned" set keyed by target identity
///
/// Written from concurrently completing targets, hence the mutex. A key is
/// cleared when its resource becomes available again so a later disappearance
/// is reported anew.
#[derive(Debug, Default)]
pub struct WarnOnce {
    warned: Mutex<HashSet<String>>,
}

impl WarnOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` at warn level unless `key` was already warned about
    ///
    /// Returns whether the message was logged.
    pub fn warn(&self, key: &str, message: &str) -> bool {
        let mut warned = self.warned.lock().unwrap();
        if warned.insert(key.to_string()) {
            warn!("{}: {}", key, message);
            true
        } else {
            false
        }
    }

    /// Forget `key`; returns whether it had been warned about
    pub fn clear(&self, key: &str) -> bool {
        let removed = self.warned.lock().unwrap().remove(key);
        if removed {
            info!("{}: available again", key);
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.warned.lock().unwrap().contains(key)
    }

    pub fn len(&self) -> usize {
        self.warned.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
