use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a recurring series advances from one occurrence to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    /// Next occurrence one calendar month later
    Monthly,
    /// Next occurrence seven days later
    Weekly,
    /// Next occurrence one calendar year later
    Yearly,
}

impl std::fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrenceType::Monthly => write!(f, "monthly"),
            RecurrenceType::Weekly => write!(f, "weekly"),
            RecurrenceType::Yearly => write!(f, "yearly"),
        }
    }
}

/// Which subset of a family an edit command is permitted to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    /// Only the one edited occurrence; no family-wide propagation
    Single,
    /// Family members dated now or later
    Future,
    /// Every family member
    All,
    /// Every family member; kept as a separate named scope for UI
    /// purposes even though its effect equals `All`
    AllIncludingPast,
}

/// One concrete dated ledger entry: a single bill, an installment of a
/// financed purchase, or one instance of a recurring charge.
///
/// Persisted verbatim as camelCase JSON; the whole occurrence list is
/// stored as one JSON array under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    /// Unique identifier, assigned at creation, never reused
    pub id: Uuid,

    /// Immutable family key shared by every occurrence generated from the
    /// same master draft. Legacy snapshots without this field get a fresh
    /// id per record on load.
    #[serde(default = "Uuid::new_v4")]
    pub family_id: Uuid,

    /// Display label; `"<base> (<k>/<n>)"` for installment members
    pub title: String,

    /// Monetary value in integer minor units (cents), non-negative
    pub amount: i64,

    /// Calendar timestamp the occurrence is due/incurred
    pub date: DateTime<Utc>,

    /// Free-form classification tag
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub is_recurring: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_type: Option<RecurrenceType>,

    /// Family length `n` when this occurrence belongs to an installment family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments_total: Option<u32>,

    /// 1-based position `k` within the installment family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_index: Option<u32>,

    #[serde(default)]
    pub is_financing: bool,

    /// Per-period interest rate in percent (e.g., 1.5 for 1.5%/month)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate_percent: Option<f64>,

    /// Monthly payment-decay rate in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_adjustment_percent: Option<f64>,

    #[serde(default)]
    pub is_paid: bool,

    /// Set exactly when `is_paid` is true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Occurrence {
    /// True when this occurrence is one member of an installment family.
    #[must_use]
    pub fn is_installment_member(&self) -> bool {
        self.installment_index.is_some() && self.installments_total.is_some()
    }

    /// The `(k, n)` pair for installment members, `None` otherwise.
    #[must_use]
    pub fn installment_position(&self) -> Option<(u32, u32)> {
        match (self.installment_index, self.installments_total) {
            (Some(k), Some(n)) => Some((k, n)),
            _ => None,
        }
    }
}
