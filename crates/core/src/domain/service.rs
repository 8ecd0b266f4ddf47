use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::PricingError;

/// Key into the configured rate table, e.g. `standard_cleaning`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceCategory(pub String);

impl ServiceCategory {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorAccess {
    #[default]
    Ground,
    Elevator,
    NoElevator,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Standard,
    Urgent,
    Immediate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Standard,
    Difficult,
    Extreme,
}

impl FloorAccess {
    pub const ALL: [Self; 3] = [Self::Ground, Self::Elevator, Self::NoElevator];

    pub fn label(self) -> &'static str {
        match self {
            Self::Ground => "ground floor",
            Self::Elevator => "upper floor with elevator",
            Self::NoElevator => "upper floor without elevator",
        }
    }
}

impl Urgency {
    pub const ALL: [Self; 3] = [Self::Standard, Self::Urgent, Self::Immediate];

    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard scheduling",
            Self::Urgent => "urgent",
            Self::Immediate => "immediate",
        }
    }
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Standard, Self::Difficult, Self::Extreme];

    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard difficulty",
            Self::Difficult => "difficult",
            Self::Extreme => "extreme",
        }
    }
}

fn normalize_token(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

impl FromStr for FloorAccess {
    type Err = PricingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "ground" => Ok(Self::Ground),
            "elevator" => Ok(Self::Elevator),
            "no_elevator" => Ok(Self::NoElevator),
            _ => Err(PricingError::invalid_parameter("floor_access", value.trim())),
        }
    }
}

impl FromStr for Urgency {
    type Err = PricingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "standard" => Ok(Self::Standard),
            "urgent" => Ok(Self::Urgent),
            "immediate" => Ok(Self::Immediate),
            _ => Err(PricingError::invalid_parameter("urgency", value.trim())),
        }
    }
}

impl FromStr for Difficulty {
    type Err = PricingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "standard" => Ok(Self::Standard),
            "difficult" => Ok(Self::Difficult),
            "extreme" => Ok(Self::Extreme),
            _ => Err(PricingError::invalid_parameter("difficulty", value.trim())),
        }
    }
}

/// One requested service task, already normalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub category: ServiceCategory,
    pub area: Decimal,
    pub levels: u32,
    pub travel_distance_km: Decimal,
    pub floor_access: FloorAccess,
    pub urgency: Urgency,
    pub difficulty: Difficulty,
}

impl ServiceSpec {
    /// A spec with neutral conditions: ground floor, standard urgency and difficulty,
    /// no travel.
    pub fn new(category: ServiceCategory, area: Decimal, levels: u32) -> Self {
        Self {
            category,
            area,
            levels,
            travel_distance_km: Decimal::ZERO,
            floor_access: FloorAccess::default(),
            urgency: Urgency::default(),
            difficulty: Difficulty::default(),
        }
    }

    /// `area × levels`; `None` when the product does not fit a `Decimal`.
    pub fn total_area(&self) -> Option<Decimal> {
        self.area.checked_mul(Decimal::from(self.levels.max(1)))
    }
}
