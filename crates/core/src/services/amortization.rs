//! Pure amortization math. No I/O, no state — every function is a plain
//! numeric mapping, easy to test in isolation.
//!
//! Monetary values are `f64` in whatever unit the caller uses consistently
//! (minor or major units). Rounding to integer minor units happens only at
//! the point an occurrence amount is finalized, via [`round_to_minor`].

use crate::errors::LedgerError;

/// The fixed periodic payment that fully repays `principal` plus compound
/// interest at `rate` per period over `periods` periods.
///
/// `rate` is a fraction (0.015 for 1.5%/period). A zero rate degenerates to
/// an equal split.
pub fn monthly_payment(principal: f64, rate: f64, periods: u32) -> Result<f64, LedgerError> {
    validate(rate, periods)?;

    if rate == 0.0 {
        return Ok(principal / f64::from(periods));
    }

    let factor = (1.0 + rate).powi(periods as i32);
    Ok(principal * rate * factor / (factor - 1.0))
}

/// Apply `payment *= (1 - adjustment_rate)` exactly `elapsed_periods` times.
///
/// Deliberately iterative rather than a closed-form power, to match the
/// compounding semantics used when the adjustment is applied month by month.
/// Monotonically non-increasing in `elapsed_periods` for
/// `0 <= adjustment_rate < 1`.
#[must_use]
pub fn decayed_payment(base_payment: f64, adjustment_rate: f64, elapsed_periods: u32) -> f64 {
    let mut payment = base_payment;
    for _ in 0..elapsed_periods {
        payment *= 1.0 - adjustment_rate;
    }
    payment
}

/// `principal * (1 + rate)^periods` — the fully compounded total.
/// Display/estimation only; never used to generate occurrence amounts.
pub fn total_with_compound_interest(
    principal: f64,
    rate: f64,
    periods: u32,
) -> Result<f64, LedgerError> {
    validate(rate, periods)?;
    Ok(principal * (1.0 + rate).powi(periods as i32))
}

/// Round to integer minor units, half away from zero.
#[must_use]
pub fn round_to_minor(value: f64) -> i64 {
    value.round() as i64
}

fn validate(rate: f64, periods: u32) -> Result<(), LedgerError> {
    if periods == 0 {
        return Err(LedgerError::InvalidAmortizationInput(
            "periods must be a positive integer".into(),
        ));
    }
    if rate < -1.0 {
        return Err(LedgerError::InvalidAmortizationInput(format!(
            "rate {rate} is below -1 (more than total loss per period)"
        )));
    }
    Ok(())
}
