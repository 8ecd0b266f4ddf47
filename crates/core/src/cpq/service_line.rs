use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::coefficients::{CoefficientResolver, CoefficientSource, Coefficients};
use crate::cpq::rate_table::{RateSource, RateTable};
use crate::domain::line_item::LineItem;
use crate::domain::service::{Difficulty, FloorAccess, ServiceSpec, Urgency};
use crate::errors::PricingError;

/// Intermediate figures behind one service line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRate {
    pub total_area: Decimal,
    pub base_rate: Decimal,
    pub coefficients: Coefficients,
    pub final_rate: Decimal,
    pub total_price: Decimal,
}

pub struct ServiceLineBuilder<R, C> {
    rates: R,
    coefficients: C,
}

impl<R, C> ServiceLineBuilder<R, C> {
    pub fn new(rates: R, coefficients: C) -> Self {
        Self { rates, coefficients }
    }

    pub fn rates(&self) -> &R {
        &self.rates
    }
}

impl Default for ServiceLineBuilder<RateTable, CoefficientResolver> {
    fn default() -> Self {
        Self::new(RateTable::reference(), CoefficientResolver::default())
    }
}

impl<R, C> ServiceLineBuilder<R, C>
where
    R: RateSource,
    C: CoefficientSource,
{
    pub fn rate(&self, spec: &ServiceSpec) -> Result<ServiceRate, PricingError> {
        let total_area = spec.total_area().ok_or_else(|| out_of_range("area", spec))?;
        let base_rate = self.rates.base_rate(&spec.category, total_area)?;
        let coefficients = self.coefficients.coefficients(spec)?;
        let final_rate = coefficients
            .product()
            .and_then(|product| base_rate.checked_mul(product))
            .ok_or_else(|| PricingError::configuration("combined rate coefficients overflow"))?;
        let total_price =
            total_area.checked_mul(final_rate).ok_or_else(|| out_of_range("area", spec))?;

        Ok(ServiceRate { total_area, base_rate, coefficients, final_rate, total_price })
    }

    pub fn build(&self, spec: &ServiceSpec) -> Result<LineItem, PricingError> {
        let rate = self.rate(spec)?;
        let label = self.rates.label(&spec.category);
        let description = format!("{label} - {} m²", rate.total_area.normalize());

        Ok(LineItem::service(description, describe(spec, &rate), rate.total_price))
    }
}

fn describe(spec: &ServiceSpec, rate: &ServiceRate) -> String {
    let mut parts = vec![format!(
        "{} m² x {} level(s) = {} m²",
        spec.area.normalize(),
        spec.levels,
        rate.total_area.normalize()
    )];
    parts.push(format!("base rate {:.2}/m²", rate.base_rate));

    if rate.coefficients.distance != Decimal::ONE {
        parts.push(format!(
            "travel {} km x{}",
            spec.travel_distance_km.normalize(),
            rate.coefficients.distance.normalize()
        ));
    }
    if spec.floor_access != FloorAccess::Ground || rate.coefficients.access != Decimal::ONE {
        parts.push(format!(
            "{} x{}",
            spec.floor_access.label(),
            rate.coefficients.access.normalize()
        ));
    }
    if spec.urgency != Urgency::Standard || rate.coefficients.urgency != Decimal::ONE {
        parts.push(format!("{} x{}", spec.urgency.label(), rate.coefficients.urgency.normalize()));
    }
    if spec.difficulty != Difficulty::Standard || rate.coefficients.difficulty != Decimal::ONE {
        parts.push(format!(
            "{} x{}",
            spec.difficulty.label(),
            rate.coefficients.difficulty.normalize()
        ));
    }

    parts.push(format!("effective rate {:.2}/m²", rate.final_rate));
    parts.join(" | ")
}

fn out_of_range(field: &'static str, spec: &ServiceSpec) -> PricingError {
    PricingError::invalid_parameter(
        field,
        format!("{} m² x {} level(s) is outside the priceable range", spec.area, spec.levels),
    )
}
