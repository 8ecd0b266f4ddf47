use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::line_item::{line_total, EditOutcome, LineItem, LineItemId, ManualAdjustment};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditedField {
    Quantity,
    UnitPrice,
    Total,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEdit {
    pub line_id: LineItemId,
    pub field: EditedField,
    pub previous_total: Decimal,
    pub new_total: Decimal,
    pub at: DateTime<Utc>,
}

/// Line items of one drafting session, in insertion order.
///
/// Each edit method treats the field it is named after as the source of truth
/// and derives exactly one other field from it:
/// quantity and unit price edits derive the total, a total edit derives the
/// unit price with quantity as the anchor.
#[derive(Clone, Debug, Default)]
pub struct LineItemStore {
    items: Vec<LineItem>,
    journal: Vec<LineEdit>,
}

impl LineItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut item: LineItem) -> LineItemId {
        item.id = LineItemId::generate();
        let id = item.id.clone();
        debug!(
            event_name = "pricing.store.line_added",
            line_id = %id,
            origin = ?item.origin,
            total_price = %item.total_price,
            "line item added"
        );
        self.items.push(item);
        id
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = LineItem>) -> Vec<LineItemId> {
        items.into_iter().map(|item| self.add(item)).collect()
    }

    pub fn remove(&mut self, id: &LineItemId) -> Option<LineItem> {
        let position = self.items.iter().position(|item| &item.id == id)?;
        debug!(event_name = "pricing.store.line_removed", line_id = %id, "line item removed");
        Some(self.items.remove(position))
    }

    pub fn update_quantity(&mut self, id: &LineItemId, quantity: i64) -> EditOutcome {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            return EditOutcome::Missing;
        };
        if !item.editable {
            warn!(
                event_name = "pricing.store.edit_locked",
                line_id = %id,
                field = "quantity",
                "quantity of a system-derived line cannot be edited"
            );
            return EditOutcome::Locked;
        }

        let previous_total = item.total_price;
        let Ok(quantity) = u32::try_from(quantity.max(1)) else {
            return rejected(id, EditedField::Quantity);
        };
        let Some(total_price) = line_total(quantity, item.unit_price) else {
            return rejected(id, EditedField::Quantity);
        };
        item.quantity = quantity;
        item.total_price = total_price;

        let new_total = item.total_price;
        self.record(id, EditedField::Quantity, previous_total, new_total);
        EditOutcome::Applied
    }

    pub fn update_unit_price(&mut self, id: &LineItemId, unit_price: Decimal) -> EditOutcome {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            return EditOutcome::Missing;
        };

        let previous_total = item.total_price;
        let unit_price = unit_price.max(Decimal::ZERO);
        let Some(total_price) = line_total(item.quantity, unit_price) else {
            return rejected(id, EditedField::UnitPrice);
        };
        mark_adjusted(item);
        item.unit_price = unit_price;
        item.total_price = total_price;

        let new_total = item.total_price;
        self.record(id, EditedField::UnitPrice, previous_total, new_total);
        EditOutcome::Applied
    }

    pub fn update_total(&mut self, id: &LineItemId, amount: Decimal) -> EditOutcome {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            return EditOutcome::Missing;
        };

        let previous_total = item.total_price;
        let amount = amount.max(Decimal::ZERO);
        mark_adjusted(item);
        item.total_price = amount;
        if item.quantity > 0 {
            item.unit_price = amount / Decimal::from(item.quantity);
        }

        self.record(id, EditedField::Total, previous_total, amount);
        EditOutcome::Applied
    }

    pub fn get(&self, id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn id_at(&self, position: usize) -> Option<&LineItemId> {
        self.items.get(position).map(|item| &item.id)
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    pub fn journal(&self) -> &[LineEdit] {
        &self.journal
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `None` when the sum leaves the `Decimal` range.
    pub fn sub_total(&self) -> Option<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total_price))
    }

    fn record(
        &mut self,
        id: &LineItemId,
        field: EditedField,
        previous_total: Decimal,
        new_total: Decimal,
    ) {
        debug!(
            event_name = "pricing.store.line_edited",
            line_id = %id,
            field = ?field,
            previous_total = %previous_total,
            new_total = %new_total,
            "line item edited"
        );
        self.journal.push(LineEdit {
            line_id: id.clone(),
            field,
            previous_total,
            new_total,
            at: Utc::now(),
        });
    }
}

fn rejected(id: &LineItemId, field: EditedField) -> EditOutcome {
    warn!(
        event_name = "pricing.store.edit_rejected",
        line_id = %id,
        field = ?field,
        "edit would push the line total outside the supported range"
    );
    EditOutcome::Rejected
}

// System-derived lines keep their computed total next to the override.
fn mark_adjusted(item: &mut LineItem) {
    if item.editable || item.adjustment.is_some() {
        return;
    }
    item.adjustment =
        Some(ManualAdjustment { computed_total: item.total_price, adjusted_at: Utc::now() });
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::{EditedField, LineItemStore};
    use crate::domain::line_item::{EditOutcome, LineItem, LineItemId};

    fn store_with_goods() -> (LineItemStore, LineItemId) {
        let mut store = LineItemStore::new();
        let id = store.add(LineItem::goods("Mop", "3 x 47.00", 3, dec!(47), None).expect("line"));
        (store, id)
    }

    #[test]
    fn add_assigns_fresh_unique_ids_in_insertion_order() {
        let mut store = LineItemStore::new();
        let first = store.add(LineItem::custom("Key pickup", 1, dec!(15)).expect("line"));
        let second = store.add(LineItem::custom("Key pickup", 1, dec!(15)).expect("line"));

        assert_ne!(first, second);
        assert!(!first.is_pending());
        assert_eq!(store.id_at(0), Some(&first));
        assert_eq!(store.id_at(1), Some(&second));
    }

    #[test]
    fn quantity_edit_clamps_to_one_and_derives_total() {
        let (mut store, id) = store_with_goods();

        assert_eq!(store.update_quantity(&id, 5), EditOutcome::Applied);
        assert_eq!(store.get(&id).map(|line| line.total_price), Some(dec!(235)));

        assert_eq!(store.update_quantity(&id, -4), EditOutcome::Applied);
        let line = store.get(&id).expect("line");
        assert_eq!(line.quantity, 1);
        assert_eq!(line.total_price, dec!(47));
        assert!(line.is_consistent());
    }

    #[test]
    fn unit_price_edit_clamps_to_zero_and_derives_total() {
        let (mut store, id) = store_with_goods();

        store.update_unit_price(&id, dec!(50.5));
        assert_eq!(store.get(&id).map(|line| line.total_price), Some(dec!(151.5)));

        store.update_unit_price(&id, dec!(-10));
        let line = store.get(&id).expect("line");
        assert_eq!(line.unit_price, Decimal::ZERO);
        assert_eq!(line.total_price, Decimal::ZERO);
    }

    #[test]
    fn total_edit_back_derives_unit_price_anchored_on_quantity() {
        let mut store = LineItemStore::new();
        let id = store.add(LineItem::custom("Carpet shampoo", 4, dec!(30)).expect("line"));

        assert_eq!(store.update_total(&id, dec!(100)), EditOutcome::Applied);
        let line = store.get(&id).expect("line");
        assert_eq!(line.quantity, 4);
        assert_eq!(line.total_price, dec!(100));
        assert_eq!(line.unit_price, dec!(25));

        store.update_total(&id, dec!(-1));
        assert_eq!(store.get(&id).map(|line| line.total_price), Some(Decimal::ZERO));
    }

    #[test]
    fn service_lines_lock_quantity_but_track_price_overrides() {
        let mut store = LineItemStore::new();
        let id = store.add(LineItem::service("Standard cleaning - 50 m²", "", dec!(800)));

        assert_eq!(store.update_quantity(&id, 3), EditOutcome::Locked);
        assert_eq!(store.get(&id).map(|line| line.quantity), Some(1));

        assert_eq!(store.update_total(&id, dec!(750)), EditOutcome::Applied);
        assert_eq!(store.update_unit_price(&id, dec!(700)), EditOutcome::Applied);

        let line = store.get(&id).expect("line");
        assert_eq!(line.total_price, dec!(700));
        assert_eq!(
            line.adjustment.as_ref().map(|adjustment| adjustment.computed_total),
            Some(dec!(800))
        );
    }

    #[test]
    fn edits_on_missing_ids_are_reported_and_remove_is_a_noop() {
        let (mut store, _) = store_with_goods();
        let ghost = LineItemId("ghost".to_string());

        assert_eq!(store.update_quantity(&ghost, 2), EditOutcome::Missing);
        assert_eq!(store.update_unit_price(&ghost, dec!(2)), EditOutcome::Missing);
        assert_eq!(store.update_total(&ghost, dec!(2)), EditOutcome::Missing);
        assert!(store.remove(&ghost).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sub_total_tracks_current_totals_independent_of_edit_order() {
        let mut forward = LineItemStore::new();
        let a = forward.add(LineItem::custom("A", 2, dec!(10)).expect("line"));
        let b = forward.add(LineItem::custom("B", 1, dec!(99)).expect("line"));
        forward.update_quantity(&a, 3);
        forward.update_total(&b, dec!(40));

        let mut backward = LineItemStore::new();
        let a = backward.add(LineItem::custom("A", 2, dec!(10)).expect("line"));
        let b = backward.add(LineItem::custom("B", 1, dec!(99)).expect("line"));
        backward.update_total(&b, dec!(40));
        backward.update_quantity(&a, 3);

        assert_eq!(forward.sub_total(), Some(dec!(70)));
        assert_eq!(backward.sub_total(), Some(dec!(70)));

        let first = forward.id_at(0).cloned().expect("first line");
        forward.remove(&first);
        assert_eq!(forward.sub_total(), Some(dec!(40)));
    }

    #[test]
    fn overflowing_edits_are_rejected_and_leave_the_line_untouched() {
        let (mut store, id) = store_with_goods();

        assert_eq!(store.update_unit_price(&id, Decimal::MAX), EditOutcome::Rejected);
        assert_eq!(store.update_quantity(&id, i64::MAX), EditOutcome::Rejected);

        let line = store.get(&id).expect("line");
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, dec!(47));
        assert_eq!(line.total_price, dec!(141));
        assert!(store.journal().is_empty());

        let mut bulk = LineItemStore::new();
        let big = bulk.add(LineItem::custom("Bulk", 1, Decimal::MAX).expect("line"));
        assert_eq!(bulk.update_quantity(&big, 2), EditOutcome::Rejected);
        bulk.add(LineItem::custom("More", 1, Decimal::MAX).expect("line"));
        assert_eq!(bulk.sub_total(), None);
    }

    #[test]
    fn journal_records_each_applied_edit() {
        let (mut store, id) = store_with_goods();
        store.update_quantity(&id, 2);
        store.update_total(&id, dec!(80));

        let fields = store.journal().iter().map(|edit| edit.field).collect::<Vec<_>>();
        assert_eq!(fields, vec![EditedField::Quantity, EditedField::Total]);
        assert_eq!(store.journal()[0].previous_total, dec!(141));
        assert_eq!(store.journal()[1].new_total, dec!(80));
    }
}
