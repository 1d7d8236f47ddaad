use async_trait::async_trait;

use crate::errors::LedgerError;

/// Trait abstraction over the external key-value persistence store.
///
/// The engine always serializes the *entire* occurrence list as one JSON
/// array under one key; there is no partial read or write. The store is
/// asynchronous, single caller at a time, no transactions.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Human-readable name of this gateway (for logs/errors).
    fn name(&self) -> &str;

    /// Load the JSON payload stored under `key`.
    /// `Ok(None)` means the key is absent — not an error.
    async fn load(&self, key: &str) -> Result<Option<String>, LedgerError>;

    /// Store the JSON payload under `key`, replacing any previous value.
    async fn save(&self, key: &str, payload: &str) -> Result<(), LedgerError>;
}
