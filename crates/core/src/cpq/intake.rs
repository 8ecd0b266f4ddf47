use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::goods::GoodsItem;
use crate::domain::line_item::{line_total, LineItem};
use crate::domain::quote::{RequestSection, SkippedRow};
use crate::domain::service::{Difficulty, FloorAccess, ServiceCategory, ServiceSpec, Urgency};
use crate::errors::PricingError;

/// A quote request as submitted by an interactive form. Numeric fields may be
/// missing, numbers, or numeric strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    #[serde(default, alias = "quoteId")]
    pub quote_id: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceRow>,
    #[serde(default)]
    pub goods: Vec<GoodsRow>,
    #[serde(default)]
    pub custom: Vec<CustomRow>,
    #[serde(default)]
    pub edits: Vec<DraftEdit>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRow {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub area: Value,
    #[serde(default)]
    pub levels: Value,
    #[serde(default, alias = "travelDistanceKm")]
    pub travel_distance_km: Value,
    #[serde(default, alias = "floorAccess")]
    pub floor_access: Value,
    #[serde(default)]
    pub urgency: Value,
    #[serde(default)]
    pub difficulty: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GoodsRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default, alias = "unitPrice")]
    pub unit_price: Value,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomRow {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default, alias = "unitPrice")]
    pub unit_price: Value,
}

/// A draft edit replayed against the line at position `line` (0-based, in
/// output order).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DraftEdit {
    Quantity { line: usize, value: Value },
    UnitPrice { line: usize, value: Value },
    Total { line: usize, value: Value },
    Remove { line: usize },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedRequest {
    pub services: Vec<(usize, ServiceSpec)>,
    pub goods: Vec<(usize, GoodsItem)>,
    pub custom: Vec<LineItem>,
    pub skipped_rows: Vec<SkippedRow>,
}

/// Coerces a request into typed rows.
///
/// Incomplete rows are excluded and reported; enum text outside the
/// recognised set is an error.
pub fn normalize_request(request: &QuoteRequest) -> Result<NormalizedRequest, PricingError> {
    let mut normalized = NormalizedRequest::default();

    for (index, row) in request.services.iter().enumerate() {
        match normalize_service_row(row)? {
            Ok(spec) => normalized.services.push((index, spec)),
            Err((code, message)) => {
                normalized.skipped_rows.push(skipped(RequestSection::Services, index, code, message))
            }
        }
    }

    for (index, row) in request.goods.iter().enumerate() {
        if let Some((code, message)) = count_problem(&row.quantity) {
            normalized.skipped_rows.push(skipped(RequestSection::Goods, index, code, message));
            continue;
        }
        normalized.goods.push((index, normalize_goods_row(row)));
    }

    for (index, row) in request.custom.iter().enumerate() {
        let description = row.description.as_deref().unwrap_or_default().trim();
        if description.is_empty() {
            normalized.skipped_rows.push(skipped(
                RequestSection::Custom,
                index,
                "BLANK_DESCRIPTION",
                "custom row has no description",
            ));
            continue;
        }

        if let Some((code, message)) = count_problem(&row.quantity) {
            normalized.skipped_rows.push(skipped(RequestSection::Custom, index, code, message));
            continue;
        }

        let quantity = u32::try_from(coerce_count(&row.quantity).max(1)).unwrap_or(1);
        let Some(line) = LineItem::custom(description, quantity, coerce_decimal(&row.unit_price))
        else {
            normalized.skipped_rows.push(skipped(
                RequestSection::Custom,
                index,
                AMOUNT_OUT_OF_RANGE.0,
                AMOUNT_OUT_OF_RANGE.1,
            ));
            continue;
        };
        normalized
            .custom
            .push(line.with_detail(row.detail.as_deref().unwrap_or_default().trim()));
    }

    Ok(normalized)
}

/// `Err` carries the skip code and message of an incomplete row.
pub type RowOutcome<T> = Result<T, (&'static str, &'static str)>;

const AMOUNT_OUT_OF_RANGE: (&str, &str) =
    ("AMOUNT_OUT_OF_RANGE", "quantity x unit price exceeds the supported range");

pub fn normalize_service_row(row: &ServiceRow) -> Result<RowOutcome<ServiceSpec>, PricingError> {
    let floor_access = parse_choice::<FloorAccess>(&row.floor_access, "floor_access")?;
    let urgency = parse_choice::<Urgency>(&row.urgency, "urgency")?;
    let difficulty = parse_choice::<Difficulty>(&row.difficulty, "difficulty")?;

    let category = row.category.as_deref().unwrap_or_default().trim().to_ascii_lowercase();
    if category.is_empty() {
        return Ok(Err(("BLANK_CATEGORY", "service row has no category")));
    }

    let area = coerce_decimal(&row.area);
    if area <= Decimal::ZERO {
        return Ok(Err(("NON_POSITIVE_AREA", "service row area must be greater than zero")));
    }

    let levels = u32::try_from(coerce_count(&row.levels).max(1)).unwrap_or(u32::MAX);

    Ok(Ok(ServiceSpec {
        category: ServiceCategory(category),
        area,
        levels,
        travel_distance_km: coerce_decimal(&row.travel_distance_km).max(Decimal::ZERO),
        floor_access,
        urgency,
        difficulty,
    }))
}

pub fn normalize_goods_row(row: &GoodsRow) -> GoodsItem {
    let quantity = u32::try_from(coerce_count(&row.quantity).max(0)).unwrap_or(u32::MAX);
    GoodsItem {
        name: row.name.as_deref().unwrap_or_default().trim().to_string(),
        quantity,
        unit_price: coerce_decimal(&row.unit_price),
        reference: row.reference.clone(),
    }
}

/// Why a goods row is not priceable, if it is not.
pub fn goods_skip_reason(item: &GoodsItem) -> Option<(&'static str, &'static str)> {
    if item.name.trim().is_empty() {
        return Some(("BLANK_NAME", "goods row has no name"));
    }
    if item.quantity == 0 {
        return Some(("NON_POSITIVE_QUANTITY", "goods row quantity must be at least 1"));
    }
    if item.unit_price <= Decimal::ZERO {
        return Some(("NON_POSITIVE_UNIT_PRICE", "goods row unit price must be greater than zero"));
    }
    if line_total(item.quantity, item.unit_price).is_none() {
        return Some(AMOUNT_OUT_OF_RANGE);
    }
    None
}

/// A quantity that is present but cannot be a line count: fractional, or
/// beyond `u32`. Missing, negative and non-numeric values are not flagged here.
pub fn count_problem(value: &Value) -> Option<(&'static str, &'static str)> {
    let count = coerce_decimal(value);
    if !count.fract().is_zero() {
        return Some(("FRACTIONAL_QUANTITY", "quantity must be a whole number"));
    }
    if count > Decimal::from(u32::MAX) {
        return Some(("QUANTITY_OUT_OF_RANGE", "quantity exceeds the supported range"));
    }
    None
}

pub fn skipped(
    section: RequestSection,
    index: usize,
    code: &str,
    message: impl Into<String>,
) -> SkippedRow {
    SkippedRow { section, index, code: code.to_string(), message: message.into() }
}

/// Numbers and numeric strings become decimals; anything else becomes zero.
pub fn coerce_decimal(value: &Value) -> Decimal {
    match value {
        Value::Number(number) => parse_decimal_token(&number.to_string()),
        Value::String(text) => parse_decimal_token(text),
        _ => None,
    }
    .unwrap_or(Decimal::ZERO)
}

pub fn coerce_count(value: &Value) -> i64 {
    coerce_decimal(value).trunc().to_i64().unwrap_or(0)
}

fn parse_decimal_token(token: &str) -> Option<Decimal> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replace(',', ".");
    Decimal::from_str(&normalized).ok().or_else(|| Decimal::from_scientific(&normalized).ok())
}

fn parse_choice<T>(value: &Value, field: &'static str) -> Result<T, PricingError>
where
    T: FromStr<Err = PricingError> + Default,
{
    match value {
        Value::Null => Ok(T::default()),
        Value::String(text) if text.trim().is_empty() => Ok(T::default()),
        Value::String(text) => text.parse(),
        other => Err(PricingError::invalid_parameter(field, other.to_string())),
    }
}
