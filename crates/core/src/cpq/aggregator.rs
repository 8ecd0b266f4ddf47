use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::line_item::LineItem;
use crate::domain::quote::{PricingTraceStep, QuoteTotals};
use crate::errors::PricingError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    pub tax_rate: Decimal,
    pub minimum_charge: Decimal,
    pub rounding_step: Decimal,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self { tax_rate: dec!(0.20), minimum_charge: dec!(500), rounding_step: dec!(10) }
    }
}

pub trait TotalsEngine: Send + Sync {
    fn totals(&self, items: &[LineItem]) -> Result<QuoteTotals, PricingError>;
}

#[derive(Clone, Debug, Default)]
pub struct QuoteAggregator {
    policy: AggregationPolicy,
}

impl QuoteAggregator {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AggregationPolicy {
        &self.policy
    }
}

impl TotalsEngine for QuoteAggregator {
    fn totals(&self, items: &[LineItem]) -> Result<QuoteTotals, PricingError> {
        compute_totals(
            items,
            self.policy.tax_rate,
            self.policy.minimum_charge,
            self.policy.rounding_step,
        )
    }
}

/// `None` when the sum leaves the `Decimal` range.
pub fn sub_total(items: &[LineItem]) -> Option<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total_price))
}

/// Sum, tax, minimum-charge floor, then snap to the rounding step.
///
/// The result never drops below `minimum_charge`: when the minimum is not a
/// multiple of the step and rounding would land under it, the next multiple
/// up is used instead. A non-positive step leaves the floored total unrounded.
///
/// Any stage leaving the `Decimal` range is an invalid `line_totals` parameter.
pub fn compute_totals(
    items: &[LineItem],
    tax_rate: Decimal,
    minimum_charge: Decimal,
    rounding_step: Decimal,
) -> Result<QuoteTotals, PricingError> {
    let sub_total = sub_total(items).ok_or_else(|| out_of_range("sum of line totals"))?;
    let tax = sub_total.checked_mul(tax_rate).ok_or_else(|| out_of_range("tax"))?;
    let total_with_tax =
        sub_total.checked_add(tax).ok_or_else(|| out_of_range("total with tax"))?;
    let minimum_applied = total_with_tax < minimum_charge;
    let floored_total = total_with_tax.max(minimum_charge);

    let mut final_price =
        round_to_step(floored_total, rounding_step).ok_or_else(|| out_of_range("rounding"))?;
    if final_price < minimum_charge && rounding_step > Decimal::ZERO {
        final_price = minimum_charge
            .checked_div(rounding_step)
            .and_then(|steps| steps.ceil().checked_mul(rounding_step))
            .ok_or_else(|| out_of_range("minimum charge"))?;
    }

    let trace = vec![
        PricingTraceStep {
            stage: "subtotal".to_string(),
            detail: format!("sum(total_price) over {} line(s)", items.len()),
            amount: sub_total,
        },
        PricingTraceStep {
            stage: "tax".to_string(),
            detail: format!("subtotal x {}", tax_rate.normalize()),
            amount: tax,
        },
        PricingTraceStep {
            stage: "total_with_tax".to_string(),
            detail: "subtotal + tax".to_string(),
            amount: total_with_tax,
        },
        PricingTraceStep {
            stage: "minimum_charge".to_string(),
            detail: if minimum_applied {
                format!("raised to minimum charge {}", minimum_charge.normalize())
            } else {
                format!("above minimum charge {}", minimum_charge.normalize())
            },
            amount: floored_total,
        },
        PricingTraceStep {
            stage: "rounding".to_string(),
            detail: if rounding_step > Decimal::ZERO {
                format!("nearest multiple of {}, half up", rounding_step.normalize())
            } else {
                "rounding disabled".to_string()
            },
            amount: final_price,
        },
    ];

    debug!(
        event_name = "pricing.totals.computed",
        line_count = items.len(),
        sub_total = %sub_total,
        final_price = %final_price,
        minimum_applied,
        "quote totals computed"
    );

    Ok(QuoteTotals {
        sub_total,
        tax,
        total_with_tax,
        floored_total,
        minimum_applied,
        final_price,
        trace,
    })
}

/// Nearest multiple of `step`, half away from zero; `None` on overflow.
pub fn round_to_step(amount: Decimal, step: Decimal) -> Option<Decimal> {
    if step <= Decimal::ZERO {
        return Some(amount);
    }
    amount
        .checked_div(step)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(step)
}

fn out_of_range(stage: &str) -> PricingError {
    PricingError::invalid_parameter("line_totals", format!("{stage} exceeds the supported range"))
}
