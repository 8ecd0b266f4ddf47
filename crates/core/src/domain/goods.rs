use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One requested physical item (consumables, equipment).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub reference: Option<String>,
}

impl GoodsItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self { name: name.into(), quantity, unit_price, reference: None }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}
