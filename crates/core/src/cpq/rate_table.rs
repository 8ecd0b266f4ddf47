use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceCategory;
use crate::errors::PricingError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTier {
    pub up_to_area: Decimal,
    pub rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRates {
    #[serde(default)]
    pub label: Option<String>,
    pub tiers: Vec<RateTier>,
}

pub trait RateSource: Send + Sync {
    fn base_rate(&self, category: &ServiceCategory, total_area: Decimal)
        -> Result<Decimal, PricingError>;

    fn label(&self, category: &ServiceCategory) -> String {
        category.0.replace('_', " ")
    }
}

/// Per-category area tiers. Larger jobs fall into cheaper tiers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    categories: BTreeMap<String, CategoryRates>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(
        mut self,
        key: impl Into<String>,
        label: Option<&str>,
        tiers: Vec<RateTier>,
    ) -> Self {
        self.categories.insert(
            key.into(),
            CategoryRates { label: label.map(str::to_string), tiers },
        );
        self
    }

    /// Reference rates per m² for the cleaning catalogue.
    pub fn reference() -> Self {
        Self::new()
            .with_category(
                "standard_cleaning",
                Some("Standard cleaning"),
                tiers(&[
                    (dec!(80), dec!(16)),
                    (dec!(150), dec!(14)),
                    (dec!(300), dec!(12)),
                    (dec!(600), dec!(10)),
                ]),
            )
            .with_category(
                "deep_cleaning",
                Some("Deep cleaning"),
                tiers(&[
                    (dec!(80), dec!(24)),
                    (dec!(150), dec!(21)),
                    (dec!(300), dec!(18)),
                    (dec!(600), dec!(15)),
                ]),
            )
            .with_category(
                "end_of_tenancy",
                Some("End-of-tenancy cleaning"),
                tiers(&[(dec!(80), dec!(20)), (dec!(150), dec!(18)), (dec!(300), dec!(16))]),
            )
            .with_category(
                "office",
                Some("Office cleaning"),
                tiers(&[(dec!(200), dec!(9)), (dec!(500), dec!(7.5)), (dec!(1000), dec!(6))]),
            )
            .with_category(
                "post_construction",
                Some("Post-construction cleaning"),
                tiers(&[(dec!(100), dec!(28)), (dec!(300), dec!(24)), (dec!(800), dec!(20))]),
            )
            .with_category(
                "window",
                Some("Window cleaning"),
                tiers(&[(dec!(50), dec!(8)), (dec!(150), dec!(6.5)), (dec!(400), dec!(5))]),
            )
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryRates)> {
        self.categories.iter().map(|(key, rates)| (key.as_str(), rates))
    }

    pub fn get(&self, category: &ServiceCategory) -> Option<&CategoryRates> {
        self.categories.get(category.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Checks every category: a trimmed lowercase key, at least one tier,
    /// strictly ascending positive thresholds, positive rates that never increase.
    ///
    /// Request categories are lowercased before lookup, so any other key could
    /// never be priced.
    pub fn validate(&self) -> Result<(), String> {
        if self.categories.is_empty() {
            return Err("rates must define at least one service category".to_string());
        }

        for (key, rates) in &self.categories {
            if key.is_empty() || key.trim() != key || key.to_ascii_lowercase() != *key {
                return Err(format!(
                    "rates.{key} must be a lowercase key without surrounding whitespace"
                ));
            }
            if rates.tiers.is_empty() {
                return Err(format!("rates.{key} has no tiers"));
            }

            let mut previous: Option<&RateTier> = None;
            for tier in &rates.tiers {
                if tier.up_to_area <= Decimal::ZERO {
                    return Err(format!("rates.{key} thresholds must be greater than zero"));
                }
                if tier.rate <= Decimal::ZERO {
                    return Err(format!("rates.{key} rates must be greater than zero"));
                }
                if let Some(previous) = previous {
                    if tier.up_to_area <= previous.up_to_area {
                        return Err(format!(
                            "rates.{key} thresholds must be strictly ascending ({} after {})",
                            tier.up_to_area, previous.up_to_area
                        ));
                    }
                    if tier.rate > previous.rate {
                        return Err(format!(
                            "rates.{key} rates must not increase with area ({} after {})",
                            tier.rate, previous.rate
                        ));
                    }
                }
                previous = Some(tier);
            }
        }

        Ok(())
    }
}

impl RateSource for RateTable {
    fn base_rate(
        &self,
        category: &ServiceCategory,
        total_area: Decimal,
    ) -> Result<Decimal, PricingError> {
        let rates = self.get(category).ok_or_else(|| {
            PricingError::configuration(format!("no rate table for service category `{category}`"))
        })?;

        rates
            .tiers
            .iter()
            .find(|tier| tier.up_to_area >= total_area)
            .or_else(|| rates.tiers.last())
            .map(|tier| tier.rate)
            .ok_or_else(|| {
                PricingError::configuration(format!(
                    "rate table for service category `{category}` has no tiers"
                ))
            })
    }

    fn label(&self, category: &ServiceCategory) -> String {
        self.get(category)
            .and_then(|rates| rates.label.clone())
            .unwrap_or_else(|| category.0.replace('_', " "))
    }
}

fn tiers(pairs: &[(Decimal, Decimal)]) -> Vec<RateTier> {
    pairs.iter().map(|&(up_to_area, rate)| RateTier { up_to_area, rate }).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::{RateSource, RateTable, RateTier};
    use crate::domain::service::ServiceCategory;
    use crate::errors::PricingError;

    fn table() -> RateTable {
        RateTable::new().with_category(
            "x",
            None,
            vec![
                RateTier { up_to_area: dec!(80), rate: dec!(16) },
                RateTier { up_to_area: dec!(150), rate: dec!(14) },
                RateTier { up_to_area: dec!(300), rate: dec!(12) },
            ],
        )
    }

    #[test]
    fn picks_smallest_threshold_covering_the_area() {
        let table = table();
        let x = ServiceCategory::new("x");
        assert_eq!(table.base_rate(&x, dec!(50)), Ok(dec!(16)));
        assert_eq!(table.base_rate(&x, dec!(80)), Ok(dec!(16)));
        assert_eq!(table.base_rate(&x, dec!(80.5)), Ok(dec!(14)));
        assert_eq!(table.base_rate(&x, dec!(300)), Ok(dec!(12)));
    }

    #[test]
    fn areas_beyond_the_last_threshold_use_the_lowest_rate() {
        let table = table();
        assert_eq!(table.base_rate(&ServiceCategory::new("x"), dec!(5000)), Ok(dec!(12)));
    }

    #[test]
    fn unknown_category_is_a_configuration_error() {
        let error = table()
            .base_rate(&ServiceCategory::new("pressure_washing"), dec!(10))
            .expect_err("unpriced category must fail");
        assert!(matches!(error, PricingError::Configuration(ref message) if message.contains("pressure_washing")));
    }

    #[test]
    fn empty_tier_list_is_a_configuration_error() {
        let table = RateTable::new().with_category("x", None, Vec::new());
        assert!(matches!(
            table.base_rate(&ServiceCategory::new("x"), dec!(10)),
            Err(PricingError::Configuration(_))
        ));
        assert!(table.validate().is_err());
    }

    #[test]
    fn validation_rejects_increasing_rates_and_unordered_thresholds() {
        let increasing = RateTable::new().with_category(
            "x",
            None,
            vec![
                RateTier { up_to_area: dec!(80), rate: dec!(10) },
                RateTier { up_to_area: dec!(150), rate: dec!(12) },
            ],
        );
        let message = increasing.validate().expect_err("rates increase");
        assert!(message.contains("must not increase"));

        let unordered = RateTable::new().with_category(
            "x",
            None,
            vec![
                RateTier { up_to_area: dec!(150), rate: dec!(12) },
                RateTier { up_to_area: dec!(80), rate: dec!(10) },
            ],
        );
        assert!(unordered.validate().expect_err("unordered").contains("strictly ascending"));
    }

    #[test]
    fn validation_rejects_keys_requests_can_never_match() {
        let tier = || vec![RateTier { up_to_area: dec!(80), rate: dec!(16) }];

        let mixed_case = RateTable::new().with_category("Office", None, tier());
        let error = mixed_case.validate().expect_err("mixed-case key");
        assert!(error.contains("rates.Office"), "{error}");

        let padded = RateTable::new().with_category(" office", None, tier());
        assert!(padded.validate().is_err());

        let lower = RateTable::new().with_category("office", None, tier());
        assert_eq!(lower.validate(), Ok(()));
    }

    #[test]
    fn reference_table_is_well_formed_and_labelled() {
        let table = RateTable::reference();
        assert_eq!(table.validate(), Ok(()));
        assert_eq!(table.label(&ServiceCategory::new("deep_cleaning")), "Deep cleaning");
        assert_eq!(table.label(&ServiceCategory::new("unknown_thing")), "unknown thing");
    }
}
