use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::errors::LedgerError;

use super::gateway::PersistenceGateway;

/// In-memory gateway: a plain map guarded by a mutex.
///
/// The default gateway for tests and ephemeral sessions. Saves can be made
/// to fail on demand so callers can exercise the memory-ahead-of-disk
/// behavior.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    entries: Mutex<HashMap<String, String>>,
    fail_saves: AtomicBool,
    save_count: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every subsequent `save` fails with `PersistenceFailure`.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Inspect the raw payload currently stored under `key`.
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .map(|entries| entries.get(key).cloned())
            .unwrap_or(None)
    }

    /// Seed a payload directly, bypassing `save` accounting.
    pub fn seed(&self, key: &str, payload: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), payload.to_string());
        }
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| LedgerError::PersistenceFailure("memory gateway poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    async fn save(&self, key: &str, payload: &str) -> Result<(), LedgerError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LedgerError::PersistenceFailure(
                "memory gateway: simulated save failure".into(),
            ));
        }

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LedgerError::PersistenceFailure("memory gateway poisoned".into()))?;
        entries.insert(key.to_string(), payload.to_string());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
