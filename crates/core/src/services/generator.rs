use chrono::{DateTime, Days, Months, Utc};
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::models::draft::ExpenseDraft;
use crate::models::occurrence::{Occurrence, RecurrenceType};
use crate::services::amortization;

/// Fixed window of occurrences emitted for a recurring series without
/// installments.
const RECURRING_WINDOW: u32 = 12;

/// Expands a master expense draft into the ordered list of occurrences to
/// persist.
///
/// Pure business logic — no I/O. The caller supplies the family id and the
/// clock so generation is deterministic under test.
pub struct OccurrenceGenerator;

impl OccurrenceGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Produce the occurrence set for one draft.
    ///
    /// Dispatch:
    /// - `installments_total = Some(n)`, `n > 1` → installment family;
    /// - otherwise, `is_recurring` with no installment count → fixed
    ///   12-occurrence recurring window;
    /// - otherwise → exactly one occurrence (installment fields absent even
    ///   when the draft carried `installments_total = Some(1)`).
    ///
    /// Occurrences are emitted in ascending time/index order; output is not
    /// re-sorted.
    pub fn generate(
        &self,
        draft: &ExpenseDraft,
        family_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>, LedgerError> {
        self.validate(draft)?;

        match draft.installments_total {
            Some(n) if n > 1 => self.generate_installments(draft, n, family_id, now),
            Some(_) => Ok(vec![self.single_occurrence(draft, family_id, now)]),
            None if draft.is_recurring => self.generate_recurring(draft, family_id, now),
            None => Ok(vec![self.single_occurrence(draft, family_id, now)]),
        }
    }

    /// Reject malformed drafts before any state changes downstream.
    fn validate(&self, draft: &ExpenseDraft) -> Result<(), LedgerError> {
        if draft.amount < 0 {
            return Err(LedgerError::InvalidExpenseDraft(
                "amount must be non-negative".into(),
            ));
        }

        match draft.installments_total {
            Some(0) => {
                return Err(LedgerError::InvalidExpenseDraft(
                    "installmentsTotal must be at least 1".into(),
                ));
            }
            Some(n) if n > 1 => {
                let current = draft.current_installment.unwrap_or(1);
                if current < 1 || current > n {
                    return Err(LedgerError::InvalidExpenseDraft(format!(
                        "currentInstallment {current} is outside 1..={n}"
                    )));
                }
            }
            _ => {}
        }

        // Recurring-without-installments needs a recurrence type to advance
        // dates by.
        if draft.installments_total.is_none()
            && draft.is_recurring
            && draft.recurrence_type.is_none()
        {
            return Err(LedgerError::InvalidExpenseDraft(
                "recurring draft has no recurrenceType".into(),
            ));
        }

        Ok(())
    }

    // ── Single mode ─────────────────────────────────────────────────

    fn single_occurrence(
        &self,
        draft: &ExpenseDraft,
        family_id: Uuid,
        now: DateTime<Utc>,
    ) -> Occurrence {
        let paid_at = if draft.is_paid {
            draft.paid_at.or(Some(draft.date))
        } else {
            None
        };

        Occurrence {
            id: Uuid::new_v4(),
            family_id,
            title: draft.title.clone(),
            amount: draft.amount,
            date: draft.date,
            category: draft.category.clone(),
            description: draft.description.clone(),
            is_recurring: false,
            recurrence_type: None,
            installments_total: None,
            installment_index: None,
            is_financing: draft.is_financing,
            interest_rate_percent: draft.interest_rate_percent,
            monthly_adjustment_percent: draft.monthly_adjustment_percent,
            is_paid: draft.is_paid,
            paid_at,
            created_at: now,
            updated_at: now,
        }
    }

    // ── Recurring mode ──────────────────────────────────────────────

    fn generate_recurring(
        &self,
        draft: &ExpenseDraft,
        family_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>, LedgerError> {
        // validate() guarantees the type is present here
        let recurrence_type = draft.recurrence_type.ok_or_else(|| {
            LedgerError::InvalidExpenseDraft("recurring draft has no recurrenceType".into())
        })?;

        let mut occurrences = Vec::with_capacity(RECURRING_WINDOW as usize);
        for i in 0..RECURRING_WINDOW {
            let date = advance_date(draft.date, recurrence_type, i)?;

            // Paid status is copied from the draft for the whole window;
            // the series is not staggered.
            let paid_at = if draft.is_paid {
                draft.paid_at.or(Some(date))
            } else {
                None
            };

            occurrences.push(Occurrence {
                id: Uuid::new_v4(),
                family_id,
                title: draft.title.clone(),
                amount: draft.amount,
                date,
                category: draft.category.clone(),
                description: draft.description.clone(),
                is_recurring: true,
                recurrence_type: Some(recurrence_type),
                installments_total: None,
                installment_index: None,
                is_financing: draft.is_financing,
                interest_rate_percent: draft.interest_rate_percent,
                monthly_adjustment_percent: draft.monthly_adjustment_percent,
                is_paid: draft.is_paid,
                paid_at,
                created_at: now,
                updated_at: now,
            });
        }

        Ok(occurrences)
    }

    // ── Installment mode ────────────────────────────────────────────

    fn generate_installments(
        &self,
        draft: &ExpenseDraft,
        n: u32,
        family_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>, LedgerError> {
        let total = draft.amount as f64;
        let current = draft.current_installment.unwrap_or(1);

        let financing_rate = if draft.is_financing {
            draft.interest_rate_percent.filter(|r| *r != 0.0)
        } else {
            None
        };
        let adjustment = if draft.is_financing {
            draft.monthly_adjustment_percent.filter(|a| *a != 0.0)
        } else {
            None
        };

        let base_payment = match financing_rate {
            Some(rate) => amortization::monthly_payment(total, rate / 100.0, n)?,
            None => total / f64::from(n),
        };

        let amounts: Vec<i64> = if financing_rate.is_none() && adjustment.is_none() {
            // Plain equal split in integer minor units: floor each share and
            // let installment 1 absorb the remainder. The first share stays
            // in [per, per + n), so no installment can go negative and the
            // family sums exactly to the drafted total.
            let per = draft.amount / i64::from(n);
            let mut amounts = vec![per; n as usize];
            amounts[0] = draft.amount - per * (i64::from(n) - 1);
            amounts
        } else {
            (0..n)
                .map(|elapsed| {
                    let payment = match adjustment {
                        Some(adj) => {
                            amortization::decayed_payment(base_payment, adj / 100.0, elapsed)
                        }
                        None => base_payment,
                    };
                    amortization::round_to_minor(payment)
                })
                .collect()
        };

        // The draft date is the due date of installment `current`; shift
        // back to installment 1 and walk forward month by month.
        let first_date = draft
            .date
            .checked_sub_months(Months::new(current - 1))
            .ok_or_else(|| {
                LedgerError::InvalidExpenseDraft("installment start date out of range".into())
            })?;

        let mut occurrences = Vec::with_capacity(n as usize);
        for i in 0..n {
            let k = i + 1;
            let date = first_date.checked_add_months(Months::new(i)).ok_or_else(|| {
                LedgerError::InvalidExpenseDraft("installment date out of range".into())
            })?;

            // Generation-time approximation: installments before the one the
            // user is currently on are assumed paid exactly on schedule.
            let is_paid = k < current;
            let paid_at = if is_paid { Some(date) } else { None };

            occurrences.push(Occurrence {
                id: Uuid::new_v4(),
                family_id,
                title: format!("{} ({}/{})", draft.title, k, n),
                amount: amounts[i as usize],
                date,
                category: draft.category.clone(),
                description: draft.description.clone(),
                is_recurring: draft.is_recurring,
                recurrence_type: draft.recurrence_type,
                installments_total: Some(n),
                installment_index: Some(k),
                is_financing: draft.is_financing,
                interest_rate_percent: draft.interest_rate_percent,
                monthly_adjustment_percent: draft.monthly_adjustment_percent,
                is_paid,
                paid_at,
                created_at: now,
                updated_at: now,
            });
        }

        Ok(occurrences)
    }
}

impl Default for OccurrenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance a date by `i` periods of the given recurrence type.
///
/// Month and year steps use chrono's calendar arithmetic, which clamps to
/// the last day of a short month (Jan 31 + 1 month = Feb 29 in 2024).
fn advance_date(
    base: DateTime<Utc>,
    recurrence_type: RecurrenceType,
    i: u32,
) -> Result<DateTime<Utc>, LedgerError> {
    let advanced = match recurrence_type {
        RecurrenceType::Weekly => base.checked_add_days(Days::new(u64::from(i) * 7)),
        RecurrenceType::Monthly => base.checked_add_months(Months::new(i)),
        RecurrenceType::Yearly => base.checked_add_months(Months::new(i * 12)),
    };
    advanced.ok_or_else(|| LedgerError::InvalidExpenseDraft("occurrence date out of range".into()))
}
