use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub String);

impl LineItemId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Placeholder carried by freshly built lines until a store assigns the real id.
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrigin {
    Service,
    Goods,
    Custom,
}

/// Result of a single store edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    Applied,
    Locked,
    Missing,
    /// The value is unusable (fractional count, or a total outside the
    /// `Decimal` range); the line is unchanged.
    Rejected,
}

/// Records that a system-derived total was overridden by hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAdjustment {
    pub computed_total: Decimal,
    pub adjusted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub origin: LineOrigin,
    pub description: String,
    pub detail: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub editable: bool,
    pub reference: Option<String>,
    pub adjustment: Option<ManualAdjustment>,
}

impl LineItem {
    /// A lump-sum service line whose price is system-derived.
    pub fn service(
        description: impl Into<String>,
        detail: impl Into<String>,
        total_price: Decimal,
    ) -> Self {
        Self {
            id: LineItemId::pending(),
            origin: LineOrigin::Service,
            description: description.into(),
            detail: detail.into(),
            quantity: 1,
            unit_price: total_price,
            total_price,
            editable: false,
            reference: None,
            adjustment: None,
        }
    }

    /// `None` when `quantity × unit_price` overflows.
    pub fn goods(
        description: impl Into<String>,
        detail: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
        reference: Option<String>,
    ) -> Option<Self> {
        let total_price = line_total(quantity, unit_price)?;
        Some(Self {
            id: LineItemId::pending(),
            origin: LineOrigin::Goods,
            description: description.into(),
            detail: detail.into(),
            quantity,
            unit_price,
            total_price,
            editable: true,
            reference,
            adjustment: None,
        })
    }

    /// A user-authored row; quantity is clamped to at least 1 and price to at least 0.
    /// `None` when the total overflows.
    pub fn custom(
        description: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Option<Self> {
        let quantity = quantity.max(1);
        let unit_price = unit_price.max(Decimal::ZERO);
        let total_price = line_total(quantity, unit_price)?;
        Some(Self {
            id: LineItemId::pending(),
            origin: LineOrigin::Custom,
            description: description.into(),
            detail: String::new(),
            quantity,
            unit_price,
            total_price,
            editable: true,
            reference: None,
            adjustment: None,
        })
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn is_consistent(&self) -> bool {
        line_total(self.quantity, self.unit_price) == Some(self.total_price)
    }
}

pub fn line_total(quantity: u32, unit_price: Decimal) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}
