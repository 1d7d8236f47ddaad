use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::errors::LedgerError;

use super::occurrence::Occurrence;

/// The canonical in-memory occurrence list plus derived aggregates.
///
/// Aggregates are recomputed after every mutation, never mutated directly.
/// The in-memory list is authoritative the instant a mutation returns; the
/// persisted mirror is eventually consistent with it.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// All occurrences, in emission order per family
    pub occurrences: Vec<Occurrence>,

    /// Sum of `amount` over all unpaid occurrences
    total_unpaid: i64,

    /// Sum of `amount` over unpaid occurrences dated in the current
    /// calendar month (relative to the `now` passed to the last recompute)
    monthly_unpaid: i64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from a loaded occurrence list, computing aggregates.
    #[must_use]
    pub fn from_occurrences(occurrences: Vec<Occurrence>, now: DateTime<Utc>) -> Self {
        let mut ledger = Self {
            occurrences,
            total_unpaid: 0,
            monthly_unpaid: 0,
        };
        ledger.recompute_totals(now);
        ledger
    }

    /// Deserialize the persisted JSON array. An absent snapshot maps to an
    /// empty ledger at the caller, not here.
    pub fn from_snapshot(payload: &str, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        let occurrences: Vec<Occurrence> = serde_json::from_str(payload)?;
        Ok(Self::from_occurrences(occurrences, now))
    }

    /// Serialize the entire occurrence list as one JSON array.
    pub fn to_snapshot(&self) -> Result<String, LedgerError> {
        serde_json::to_string(&self.occurrences)
            .map_err(|e| LedgerError::Serialization(format!("Failed to serialize occurrence list: {e}")))
    }

    /// Recompute both derived aggregates from scratch.
    pub fn recompute_totals(&mut self, now: DateTime<Utc>) {
        self.total_unpaid = self
            .occurrences
            .iter()
            .filter(|o| !o.is_paid)
            .map(|o| o.amount)
            .sum();

        self.monthly_unpaid = self
            .occurrences
            .iter()
            .filter(|o| {
                !o.is_paid && o.date.year() == now.year() && o.date.month() == now.month()
            })
            .map(|o| o.amount)
            .sum();
    }

    #[must_use]
    pub fn total_unpaid(&self) -> i64 {
        self.total_unpaid
    }

    #[must_use]
    pub fn monthly_unpaid(&self) -> i64 {
        self.monthly_unpaid
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Occurrence> {
        self.occurrences.iter().find(|o| o.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: Uuid) -> Option<&mut Occurrence> {
        self.occurrences.iter_mut().find(|o| o.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}
