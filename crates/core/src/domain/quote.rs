use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::line_item::{EditOutcome, LineItem};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(format!("Q-{}", Uuid::new_v4().simple()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

/// Derived totals; recomputed from the line items every time, never edited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub sub_total: Decimal,
    pub tax: Decimal,
    pub total_with_tax: Decimal,
    pub floored_total: Decimal,
    pub minimum_applied: bool,
    pub final_price: Decimal,
    pub trace: Vec<PricingTraceStep>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSection {
    Services,
    Goods,
    Custom,
}

/// An incomplete draft row excluded from pricing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub section: RequestSection,
    pub index: usize,
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedQuote {
    pub quote_id: QuoteId,
    pub currency: String,
    pub lines: Vec<LineItem>,
    pub totals: QuoteTotals,
    pub skipped_rows: Vec<SkippedRow>,
    pub edit_outcomes: Vec<EditOutcome>,
}
