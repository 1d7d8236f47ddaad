use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::models::draft::ExpenseDraft;
use crate::models::ledger::Ledger;
use crate::models::occurrence::{EditScope, Occurrence};
use crate::services::family;
use crate::services::generator::OccurrenceGenerator;

/// The single entry point for all write operations on the ledger.
///
/// Every operation is all-or-nothing: validation errors and missing targets
/// leave the ledger untouched, and derived totals are recomputed before a
/// successful return. Pure in-memory logic — persistence happens above.
pub struct MutationEngine {
    generator: OccurrenceGenerator,
}

impl MutationEngine {
    pub fn new() -> Self {
        Self {
            generator: OccurrenceGenerator::new(),
        }
    }

    /// Expand a draft into its occurrence family and append it.
    /// Returns the freshly assigned family id.
    pub fn create(
        &self,
        ledger: &mut Ledger,
        draft: &ExpenseDraft,
        now: DateTime<Utc>,
    ) -> Result<Uuid, LedgerError> {
        let family_id = Uuid::new_v4();
        let occurrences = self.generator.generate(draft, family_id, now)?;
        ledger.occurrences.extend(occurrences);
        ledger.recompute_totals(now);
        Ok(family_id)
    }

    /// Replace exactly the occurrence with a matching id. No family-wide
    /// effect. `created_at` and `family_id` are immutable and preserved;
    /// `paid_at` is kept consistent with `is_paid` regardless of what the
    /// caller supplied.
    pub fn edit_single(
        &self,
        ledger: &mut Ledger,
        updated: Occurrence,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let Some(existing) = ledger.get_mut(updated.id) else {
            return Err(LedgerError::NotFound(updated.id.to_string()));
        };

        let created_at = existing.created_at;
        let family_id = existing.family_id;
        let mut replacement = Occurrence {
            created_at,
            family_id,
            updated_at: now,
            ..updated
        };
        normalize_paid(&mut replacement, now);
        *existing = replacement;

        ledger.recompute_totals(now);
        Ok(())
    }

    /// Apply an edit across a family under the given scope.
    ///
    /// The edited occurrence itself is always replaced in full. Propagation
    /// to other members overwrites the draft-owned fields (amount, category,
    /// description, recurrence/financing parameters) and rebases each
    /// member's title onto the new base title while keeping that member's
    /// own `(k/n)` suffix; ids, dates, creation stamps, installment
    /// positions, and recorded payment state stay with each member.
    ///
    /// Returns the number of occurrences touched.
    pub fn edit_family(
        &self,
        ledger: &mut Ledger,
        updated: &Occurrence,
        scope: EditScope,
        now: DateTime<Utc>,
    ) -> Result<usize, LedgerError> {
        if scope == EditScope::Single {
            // Intentionally no family-wide field propagation.
            self.edit_single(ledger, updated.clone(), now)?;
            return Ok(1);
        }

        if !ledger
            .occurrences
            .iter()
            .any(|o| o.family_id == updated.family_id)
        {
            return Err(LedgerError::NotFound(format!(
                "family {}",
                updated.family_id
            )));
        }

        let new_base = family::base_title(&updated.title).to_string();
        let mut touched = 0;

        for occurrence in ledger
            .occurrences
            .iter_mut()
            .filter(|o| o.family_id == updated.family_id)
        {
            if occurrence.id == updated.id {
                let created_at = occurrence.created_at;
                let family_id = occurrence.family_id;
                let mut replacement = Occurrence {
                    created_at,
                    family_id,
                    updated_at: now,
                    ..updated.clone()
                };
                normalize_paid(&mut replacement, now);
                *occurrence = replacement;
                touched += 1;
                continue;
            }

            // `future` leaves members dated before now untouched; both
            // `all` scopes propagate to the whole family.
            if scope == EditScope::Future && occurrence.date < now {
                continue;
            }

            occurrence.title = match occurrence.installment_position() {
                Some((k, n)) => format!("{new_base} ({k}/{n})"),
                None => new_base.clone(),
            };
            occurrence.amount = updated.amount;
            occurrence.category = updated.category.clone();
            occurrence.description = updated.description.clone();
            occurrence.is_recurring = updated.is_recurring;
            occurrence.recurrence_type = updated.recurrence_type;
            occurrence.is_financing = updated.is_financing;
            occurrence.interest_rate_percent = updated.interest_rate_percent;
            occurrence.monthly_adjustment_percent = updated.monthly_adjustment_percent;
            occurrence.updated_at = now;
            touched += 1;
        }

        ledger.recompute_totals(now);
        Ok(touched)
    }

    /// Remove every member of a family. Returns the number removed.
    pub fn delete_family(
        &self,
        ledger: &mut Ledger,
        family_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<usize, LedgerError> {
        let before = ledger.occurrences.len();
        ledger.occurrences.retain(|o| o.family_id != family_id);
        let removed = before - ledger.occurrences.len();

        if removed == 0 {
            return Err(LedgerError::NotFound(format!("family {family_id}")));
        }

        ledger.recompute_totals(now);
        Ok(removed)
    }

    /// Remove every occurrence whose stripped title matches the reference
    /// title. Label-derived membership: colliding base titles are merged
    /// silently (documented hazard of the title surface).
    pub fn delete_family_by_title(
        &self,
        ledger: &mut Ledger,
        reference_title: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, LedgerError> {
        let reference = family::base_title(reference_title).to_string();
        let before = ledger.occurrences.len();
        ledger
            .occurrences
            .retain(|o| family::base_title(&o.title) != reference);
        let removed = before - ledger.occurrences.len();

        if removed == 0 {
            return Err(LedgerError::NotFound(format!("title '{reference_title}'")));
        }

        ledger.recompute_totals(now);
        Ok(removed)
    }

    /// Rebuild a family from a changed draft (installment count or
    /// financing terms changed), preserving manually recorded payment
    /// history by installment index.
    ///
    /// The family keeps its id. Capture happens before deletion; generation
    /// happens before deletion too, so a rejected draft leaves the ledger
    /// untouched.
    pub fn regenerate_family(
        &self,
        ledger: &mut Ledger,
        new_draft: &ExpenseDraft,
        family_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, LedgerError> {
        // 1. Capture paid state per installment index.
        let members = family::members_of(&ledger.occurrences, family_id);
        if members.is_empty() {
            return Err(LedgerError::NotFound(format!("family {family_id}")));
        }
        let paid_history: HashMap<u32, Option<DateTime<Utc>>> = members
            .iter()
            .filter(|o| o.is_paid)
            .filter_map(|o| o.installment_index.map(|k| (k, o.paid_at)))
            .collect();

        // 2. Generate the replacement set under the same family id.
        let mut fresh = self.generator.generate(new_draft, family_id, now)?;

        // 3. Drop the old members.
        ledger.occurrences.retain(|o| o.family_id != family_id);

        // 4. Re-apply captured payment history by matching index.
        for occurrence in &mut fresh {
            if let Some(paid_at) = occurrence
                .installment_index
                .and_then(|k| paid_history.get(&k).copied())
            {
                occurrence.is_paid = true;
                occurrence.paid_at = paid_at.or(Some(occurrence.date));
            }
        }

        let ids = fresh.iter().map(|o| o.id).collect();
        ledger.occurrences.extend(fresh);
        ledger.recompute_totals(now);
        Ok(ids)
    }

    /// Toggle one occurrence's paid flag. `paid_at` is the override or now
    /// when marking paid, and cleared when marking unpaid. No family effect.
    pub fn set_paid(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
        is_paid: bool,
        paid_at_override: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let Some(occurrence) = ledger.get_mut(id) else {
            return Err(LedgerError::NotFound(id.to_string()));
        };

        occurrence.is_paid = is_paid;
        occurrence.paid_at = if is_paid {
            Some(paid_at_override.unwrap_or(now))
        } else {
            None
        };

        ledger.recompute_totals(now);
        Ok(())
    }

    /// Explicit delete of one occurrence; family members are untouched.
    pub fn delete_occurrence(
        &self,
        ledger: &mut Ledger,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let Some(idx) = ledger.occurrences.iter().position(|o| o.id == id) else {
            return Err(LedgerError::NotFound(id.to_string()));
        };

        ledger.occurrences.remove(idx);
        ledger.recompute_totals(now);
        Ok(())
    }
}

impl Default for MutationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep `paid_at` consistent with `is_paid` on a full replacement: a paying
/// edit without a timestamp is stamped `now`, an unpaid edit drops any
/// stale timestamp the caller left behind.
fn normalize_paid(occurrence: &mut Occurrence, now: DateTime<Utc>) {
    occurrence.paid_at = if occurrence.is_paid {
        occurrence.paid_at.or(Some(now))
    } else {
        None
    };
}
