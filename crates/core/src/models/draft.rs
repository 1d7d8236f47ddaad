use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::occurrence::RecurrenceType;

/// The user-entered master template from which occurrences are generated.
///
/// `amount` is the **total** principal in minor units when
/// `installments_total > 1`, and the per-period amount otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    pub title: String,

    /// Minor units (cents); total principal for installment mode
    pub amount: i64,

    /// Due date of the occurrence — for mid-series entry, the due date of
    /// installment `current_installment`
    pub date: DateTime<Utc>,

    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub is_recurring: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_type: Option<RecurrenceType>,

    /// Family length `n`; `Some(n)` with `n > 1` selects installment mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments_total: Option<u32>,

    /// 1-based installment the user is currently on (defaults to 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_installment: Option<u32>,

    #[serde(default)]
    pub is_financing: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate_percent: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_adjustment_percent: Option<f64>,

    #[serde(default)]
    pub is_paid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl ExpenseDraft {
    /// A one-off expense: no recurrence, no installments.
    pub fn single(
        title: impl Into<String>,
        amount: i64,
        date: DateTime<Utc>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            amount,
            date,
            category: category.into(),
            description: None,
            is_recurring: false,
            recurrence_type: None,
            installments_total: None,
            current_installment: None,
            is_financing: false,
            interest_rate_percent: None,
            monthly_adjustment_percent: None,
            is_paid: false,
            paid_at: None,
        }
    }

    /// A recurring expense without installments (fixed 12-occurrence window).
    pub fn recurring(
        title: impl Into<String>,
        amount: i64,
        date: DateTime<Utc>,
        category: impl Into<String>,
        recurrence_type: RecurrenceType,
    ) -> Self {
        Self {
            is_recurring: true,
            recurrence_type: Some(recurrence_type),
            ..Self::single(title, amount, date, category)
        }
    }

    /// An installment purchase of `total` minor units split over `n` months.
    pub fn installments(
        title: impl Into<String>,
        total: i64,
        date: DateTime<Utc>,
        category: impl Into<String>,
        n: u32,
    ) -> Self {
        Self {
            is_recurring: true,
            recurrence_type: Some(RecurrenceType::Monthly),
            installments_total: Some(n),
            current_installment: Some(1),
            ..Self::single(title, total, date, category)
        }
    }

    /// Mark the draft as a financing plan with a per-period interest rate
    /// and an optional monthly payment-decay rate (both in percent).
    #[must_use]
    pub fn with_financing(mut self, interest_rate_percent: f64, monthly_adjustment_percent: Option<f64>) -> Self {
        self.is_financing = true;
        self.interest_rate_percent = Some(interest_rate_percent);
        self.monthly_adjustment_percent = monthly_adjustment_percent;
        self
    }

    /// Mid-series entry: the draft date is the due date of installment `k`.
    #[must_use]
    pub fn starting_at_installment(mut self, k: u32) -> Self {
        self.current_installment = Some(k);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
