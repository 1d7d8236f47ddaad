use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::errors::LedgerError;

use super::gateway::PersistenceGateway;

/// File-backed gateway: one `<key>.json` file per key inside a base
/// directory. Suitable for native desktop/CLI hosts.
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    base_dir: PathBuf,
}

impl JsonFileGateway {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are library-chosen identifiers, not user input; a flat
        // sanitize keeps them filesystem-safe anyway.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{safe}.json"))
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[async_trait]
impl PersistenceGateway for JsonFileGateway {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn load(&self, key: &str) -> Result<Option<String>, LedgerError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, payload: &str) -> Result<(), LedgerError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        tokio::fs::write(self.path_for(key), payload).await?;
        Ok(())
    }
}
