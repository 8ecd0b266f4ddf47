use rust_decimal::Decimal;

use crate::domain::goods::GoodsItem;
use crate::domain::line_item::LineItem;

#[derive(Clone, Copy, Debug, Default)]
pub struct GoodsLineBuilder;

impl GoodsLineBuilder {
    /// Prices a goods row, or returns `None` for an incomplete draft row
    /// (blank name, zero quantity, non-positive unit price) or one whose total
    /// overflows.
    pub fn build(&self, item: &GoodsItem) -> Option<LineItem> {
        let name = item.name.trim();
        if name.is_empty() || item.quantity == 0 || item.unit_price <= Decimal::ZERO {
            return None;
        }

        let detail = match &item.reference {
            Some(reference) if !reference.trim().is_empty() => {
                format!("ref {} | {} x {:.2}", reference.trim(), item.quantity, item.unit_price)
            }
            _ => format!("{} x {:.2}", item.quantity, item.unit_price),
        };

        LineItem::goods(
            name,
            detail,
            item.quantity,
            item.unit_price,
            item.reference.clone().filter(|reference| !reference.trim().is_empty()),
        )
    }
}
