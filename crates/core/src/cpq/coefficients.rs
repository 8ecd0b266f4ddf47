use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::service::{Difficulty, FloorAccess, ServiceSpec, Urgency};
use crate::errors::PricingError;

/// Independent multipliers applied on top of the base rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coefficients {
    pub distance: Decimal,
    pub access: Decimal,
    pub urgency: Decimal,
    pub difficulty: Decimal,
}

impl Coefficients {
    pub fn neutral() -> Self {
        Self {
            distance: Decimal::ONE,
            access: Decimal::ONE,
            urgency: Decimal::ONE,
            difficulty: Decimal::ONE,
        }
    }

    /// Combined multiplier; `None` if the factors overflow a `Decimal`.
    pub fn product(&self) -> Option<Decimal> {
        self.distance
            .checked_mul(self.access)?
            .checked_mul(self.urgency)?
            .checked_mul(self.difficulty)
    }
}

pub trait CoefficientSource: Send + Sync {
    fn coefficients(&self, spec: &ServiceSpec) -> Result<Coefficients, PricingError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessFactors {
    pub ground: Decimal,
    pub elevator: Decimal,
    pub no_elevator: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyFactors {
    pub standard: Decimal,
    pub urgent: Decimal,
    pub immediate: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyFactors {
    pub standard: Decimal,
    pub difficult: Decimal,
    pub extreme: Decimal,
}

impl AccessFactors {
    pub fn factor(&self, access: FloorAccess) -> Decimal {
        match access {
            FloorAccess::Ground => self.ground,
            FloorAccess::Elevator => self.elevator,
            FloorAccess::NoElevator => self.no_elevator,
        }
    }
}

impl UrgencyFactors {
    pub fn factor(&self, urgency: Urgency) -> Decimal {
        match urgency {
            Urgency::Standard => self.standard,
            Urgency::Urgent => self.urgent,
            Urgency::Immediate => self.immediate,
        }
    }
}

impl DifficultyFactors {
    pub fn factor(&self, difficulty: Difficulty) -> Decimal {
        match difficulty {
            Difficulty::Standard => self.standard,
            Difficulty::Difficult => self.difficult,
            Difficulty::Extreme => self.extreme,
        }
    }
}

/// The multiplier policy. Every enum variant has its own entry, so a lookup
/// can never fall through to a guessed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoefficientTable {
    pub distance_threshold_km: Decimal,
    pub distance_factor: Decimal,
    pub access: AccessFactors,
    pub urgency: UrgencyFactors,
    pub difficulty: DifficultyFactors,
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self {
            distance_threshold_km: dec!(10),
            distance_factor: dec!(1.15),
            access: AccessFactors {
                ground: dec!(1.0),
                elevator: dec!(1.1),
                no_elevator: dec!(1.3),
            },
            urgency: UrgencyFactors {
                standard: dec!(1.0),
                urgent: dec!(1.4),
                immediate: dec!(1.8),
            },
            difficulty: DifficultyFactors {
                standard: dec!(1.0),
                difficult: dec!(1.2),
                extreme: dec!(1.5),
            },
        }
    }
}

impl CoefficientTable {
    pub fn distance_factor(&self, travel_distance_km: Decimal) -> Decimal {
        if travel_distance_km > self.distance_threshold_km {
            self.distance_factor
        } else {
            Decimal::ONE
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.distance_threshold_km < Decimal::ZERO {
            return Err("coefficients.distance_threshold_km must not be negative".to_string());
        }

        let factors = [
            ("coefficients.distance_factor", self.distance_factor),
            ("coefficients.access.ground", self.access.ground),
            ("coefficients.access.elevator", self.access.elevator),
            ("coefficients.access.no_elevator", self.access.no_elevator),
            ("coefficients.urgency.standard", self.urgency.standard),
            ("coefficients.urgency.urgent", self.urgency.urgent),
            ("coefficients.urgency.immediate", self.urgency.immediate),
            ("coefficients.difficulty.standard", self.difficulty.standard),
            ("coefficients.difficulty.difficult", self.difficulty.difficult),
            ("coefficients.difficulty.extreme", self.difficulty.extreme),
        ];

        for (key, factor) in factors {
            if factor < Decimal::ONE {
                return Err(format!("{key} must be at least 1.0 (got {factor})"));
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CoefficientResolver {
    table: CoefficientTable,
}

impl CoefficientResolver {
    pub fn new(table: CoefficientTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CoefficientTable {
        &self.table
    }
}

impl CoefficientSource for CoefficientResolver {
    fn coefficients(&self, spec: &ServiceSpec) -> Result<Coefficients, PricingError> {
        if spec.travel_distance_km < Decimal::ZERO {
            return Err(PricingError::invalid_parameter(
                "travel_distance_km",
                spec.travel_distance_km.to_string(),
            ));
        }

        Ok(Coefficients {
            distance: self.table.distance_factor(spec.travel_distance_km),
            access: self.table.access.factor(spec.floor_access),
            urgency: self.table.urgency.factor(spec.urgency),
            difficulty: self.table.difficulty.factor(spec.difficulty),
        })
    }
}
