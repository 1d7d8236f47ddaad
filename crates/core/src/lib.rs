pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use models::draft::ExpenseDraft;
use models::ledger::Ledger;
use models::occurrence::{EditScope, Occurrence};
use services::family;
use services::mutation::MutationEngine;
use storage::gateway::PersistenceGateway;
use storage::writer::SnapshotWriter;

use errors::LedgerError;

/// Default persistence key for the occurrence list.
pub const DEFAULT_STORAGE_KEY: &str = "expense_ledger";

/// Main entry point for the expense-ledger core library.
///
/// An explicit store object constructed once per session with an injected
/// persistence gateway — no module-level singleton. All mutations run to
/// completion against the in-memory ledger before a full snapshot is
/// enqueued on a single-writer queue; the in-memory state is authoritative
/// the instant a command returns. Call [`ExpenseLedger::flush`] to await
/// the last enqueued write and observe any persistence failure.
///
/// Must be constructed inside a Tokio runtime (the snapshot writer is a
/// spawned task).
#[must_use]
pub struct ExpenseLedger {
    ledger: Ledger,
    engine: MutationEngine,
    gateway: Arc<dyn PersistenceGateway>,
    writer: SnapshotWriter,
    storage_key: String,
}

impl std::fmt::Debug for ExpenseLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpenseLedger")
            .field("occurrences", &self.ledger.len())
            .field("total_unpaid", &self.ledger.total_unpaid())
            .field("monthly_unpaid", &self.ledger.monthly_unpaid())
            .field("gateway", &self.gateway.name())
            .field("storage_key", &self.storage_key)
            .finish()
    }
}

impl ExpenseLedger {
    /// Create an empty ledger over the given gateway, using the default
    /// storage key.
    pub fn with_gateway(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self::with_gateway_and_key(gateway, DEFAULT_STORAGE_KEY)
    }

    /// Create an empty ledger over the given gateway and storage key.
    pub fn with_gateway_and_key(
        gateway: Arc<dyn PersistenceGateway>,
        storage_key: impl Into<String>,
    ) -> Self {
        let writer = SnapshotWriter::spawn(Arc::clone(&gateway));
        Self {
            ledger: Ledger::new(),
            engine: MutationEngine::new(),
            gateway,
            writer,
            storage_key: storage_key.into(),
        }
    }

    /// Load the persisted occurrence list, replacing the in-memory state.
    /// An absent snapshot initializes an empty ledger — not an error.
    pub async fn load(&mut self) -> Result<(), LedgerError> {
        let now = Utc::now();
        self.ledger = match self.gateway.load(&self.storage_key).await? {
            Some(payload) => Ledger::from_snapshot(&payload, now)?,
            None => Ledger::new(),
        };
        Ok(())
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Expand a master draft into its occurrence family and persist.
    /// Returns the freshly assigned family id.
    pub fn create(&mut self, draft: &ExpenseDraft) -> Result<Uuid, LedgerError> {
        let family_id = self.engine.create(&mut self.ledger, draft, Utc::now())?;
        self.persist()?;
        Ok(family_id)
    }

    /// Replace exactly the occurrence with a matching id; no family-wide
    /// effect.
    pub fn edit_single(&mut self, occurrence: Occurrence) -> Result<(), LedgerError> {
        self.engine
            .edit_single(&mut self.ledger, occurrence, Utc::now())?;
        self.persist()
    }

    /// Apply an edit across the edited occurrence's family under the given
    /// scope. Returns the number of occurrences touched.
    pub fn edit_family(
        &mut self,
        updated: &Occurrence,
        scope: EditScope,
    ) -> Result<usize, LedgerError> {
        let touched = self
            .engine
            .edit_family(&mut self.ledger, updated, scope, Utc::now())?;
        self.persist()?;
        Ok(touched)
    }

    /// Remove every member of a family. Returns the number removed.
    pub fn delete_family(&mut self, family_id: Uuid) -> Result<usize, LedgerError> {
        let removed = self
            .engine
            .delete_family(&mut self.ledger, family_id, Utc::now())?;
        self.persist()?;
        Ok(removed)
    }

    /// Remove every occurrence matching the reference title after suffix
    /// stripping (the label-derived surface; colliding base titles merge).
    pub fn delete_family_by_title(&mut self, reference_title: &str) -> Result<usize, LedgerError> {
        let removed =
            self.engine
                .delete_family_by_title(&mut self.ledger, reference_title, Utc::now())?;
        self.persist()?;
        Ok(removed)
    }

    /// Rebuild a family from a changed draft, preserving recorded payment
    /// history by installment index. Returns the new occurrence ids.
    pub fn regenerate_family(
        &mut self,
        new_draft: &ExpenseDraft,
        family_id: Uuid,
    ) -> Result<Vec<Uuid>, LedgerError> {
        let ids =
            self.engine
                .regenerate_family(&mut self.ledger, new_draft, family_id, Utc::now())?;
        self.persist()?;
        Ok(ids)
    }

    /// Toggle one occurrence's paid flag.
    pub fn set_paid(
        &mut self,
        id: Uuid,
        is_paid: bool,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerError> {
        self.engine
            .set_paid(&mut self.ledger, id, is_paid, paid_at, Utc::now())?;
        self.persist()
    }

    /// Explicit delete of a single occurrence.
    pub fn delete_occurrence(&mut self, id: Uuid) -> Result<(), LedgerError> {
        self.engine
            .delete_occurrence(&mut self.ledger, id, Utc::now())?;
        self.persist()
    }

    /// Await the last enqueued persistence write; surfaces the most recent
    /// save failure if one occurred. Memory is never rolled back.
    pub async fn flush(&self) -> Result<(), LedgerError> {
        self.writer.flush().await
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// All occurrences, in stored order.
    #[must_use]
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.ledger.occurrences
    }

    /// Look up a single occurrence by id.
    #[must_use]
    pub fn get_occurrence(&self, id: Uuid) -> Option<&Occurrence> {
        self.ledger.get(id)
    }

    /// All members of a family, by explicit family id.
    #[must_use]
    pub fn family_members(&self, family_id: Uuid) -> Vec<&Occurrence> {
        family::members_of(&self.ledger.occurrences, family_id)
    }

    /// All occurrences matching a reference title after suffix stripping.
    #[must_use]
    pub fn family_members_by_title(&self, reference_title: &str) -> Vec<&Occurrence> {
        family::members_by_title(&self.ledger.occurrences, reference_title)
    }

    /// Sum of `amount` over all unpaid occurrences.
    #[must_use]
    pub fn total_unpaid(&self) -> i64 {
        self.ledger.total_unpaid()
    }

    /// Sum of `amount` over unpaid occurrences dated in the current
    /// calendar month.
    #[must_use]
    pub fn monthly_unpaid(&self) -> i64 {
        self.ledger.monthly_unpaid()
    }

    #[must_use]
    pub fn occurrence_count(&self) -> usize {
        self.ledger.len()
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export the full occurrence list as a pretty JSON array (backup).
    pub fn export_to_json(&self) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(&self.ledger.occurrences)
            .map_err(|e| LedgerError::Serialization(format!("Failed to serialize occurrences: {e}")))
    }

    /// Replace the whole ledger with an imported occurrence list and
    /// persist. Returns the number of occurrences imported.
    pub fn import_json(&mut self, json: &str) -> Result<usize, LedgerError> {
        let imported = Ledger::from_snapshot(json, Utc::now())?;
        let count = imported.len();
        self.ledger = imported;
        self.persist()?;
        Ok(count)
    }

    // ── Internal ────────────────────────────────────────────────────

    /// Enqueue a full snapshot on the single-writer queue. Non-blocking;
    /// failures here mean the writer task itself is gone.
    fn persist(&self) -> Result<(), LedgerError> {
        let payload = self.ledger.to_snapshot()?;
        self.writer.enqueue(&self.storage_key, payload)
    }
}
