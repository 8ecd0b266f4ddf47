pub mod aggregator;
pub mod coefficients;
pub mod goods_line;
pub mod intake;
pub mod line_store;
pub mod rate_table;
pub mod service_line;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::line_item::{EditOutcome, LineItem};
use crate::domain::quote::{PricedQuote, QuoteId, QuoteTotals, RequestSection, SkippedRow};
use crate::errors::PricingError;

use self::{
    aggregator::{AggregationPolicy, QuoteAggregator, TotalsEngine},
    coefficients::{CoefficientResolver, CoefficientSource, CoefficientTable},
    goods_line::GoodsLineBuilder,
    intake::{
        coerce_count, coerce_decimal, count_problem, goods_skip_reason, normalize_request,
        skipped, DraftEdit, QuoteRequest,
    },
    line_store::LineItemStore,
    rate_table::{RateSource, RateTable},
    service_line::ServiceLineBuilder,
};

/// Everything a quote is priced against. Supplied from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub currency: String,
    pub aggregation: AggregationPolicy,
    pub rates: RateTable,
    pub coefficients: CoefficientTable,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            aggregation: AggregationPolicy::default(),
            rates: RateTable::reference(),
            coefficients: CoefficientTable::default(),
        }
    }
}

/// One in-progress quote: its line items plus the rows that were left out.
#[derive(Clone, Debug)]
pub struct QuoteDraft {
    pub quote_id: QuoteId,
    pub store: LineItemStore,
    pub skipped_rows: Vec<SkippedRow>,
    pub edit_outcomes: Vec<EditOutcome>,
}

pub trait QuoteEngine: Send + Sync {
    fn open_draft(&self, request: &QuoteRequest) -> Result<QuoteDraft, PricingError>;

    fn totals(&self, lines: &[LineItem]) -> Result<QuoteTotals, PricingError>;

    fn currency(&self) -> &str;

    fn price_request(&self, request: &QuoteRequest) -> Result<PricedQuote, PricingError> {
        let mut draft = self.open_draft(request)?;
        for edit in &request.edits {
            let outcome = apply_edit(&mut draft.store, edit);
            draft.edit_outcomes.push(outcome);
        }
        self.finalize(draft)
    }

    fn finalize(&self, draft: QuoteDraft) -> Result<PricedQuote, PricingError> {
        let totals = self.totals(draft.store.items())?;
        info!(
            event_name = "pricing.quote.priced",
            quote_id = %draft.quote_id.0,
            line_count = draft.store.len(),
            skipped_rows = draft.skipped_rows.len(),
            final_price = %totals.final_price,
            "quote priced"
        );

        Ok(PricedQuote {
            quote_id: draft.quote_id,
            currency: self.currency().to_string(),
            lines: draft.store.into_items(),
            totals,
            skipped_rows: draft.skipped_rows,
            edit_outcomes: draft.edit_outcomes,
        })
    }
}

pub struct DeterministicQuoteEngine<R, C, T> {
    service_lines: ServiceLineBuilder<R, C>,
    goods_lines: GoodsLineBuilder,
    totals_engine: T,
    currency: String,
}

impl<R, C, T> DeterministicQuoteEngine<R, C, T> {
    pub fn new(
        service_lines: ServiceLineBuilder<R, C>,
        totals_engine: T,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            service_lines,
            goods_lines: GoodsLineBuilder,
            totals_engine,
            currency: currency.into(),
        }
    }
}

impl DeterministicQuoteEngine<RateTable, CoefficientResolver, QuoteAggregator> {
    pub fn from_policy(policy: PricingPolicy) -> Self {
        Self::new(
            ServiceLineBuilder::new(policy.rates, CoefficientResolver::new(policy.coefficients)),
            QuoteAggregator::new(policy.aggregation),
            policy.currency,
        )
    }
}

impl Default for DeterministicQuoteEngine<RateTable, CoefficientResolver, QuoteAggregator> {
    fn default() -> Self {
        Self::from_policy(PricingPolicy::default())
    }
}

impl<R, C, T> QuoteEngine for DeterministicQuoteEngine<R, C, T>
where
    R: RateSource,
    C: CoefficientSource,
    T: TotalsEngine,
{
    fn open_draft(&self, request: &QuoteRequest) -> Result<QuoteDraft, PricingError> {
        let normalized = normalize_request(request)?;
        let mut skipped_rows = normalized.skipped_rows;
        let mut store = LineItemStore::new();

        for (index, spec) in &normalized.services {
            let line = self.service_lines.build(spec)?;
            debug!(
                event_name = "pricing.line.built",
                section = "services",
                row = index,
                total_price = %line.total_price,
                "service line built"
            );
            store.add(line);
        }

        for (index, item) in &normalized.goods {
            match self.goods_lines.build(item) {
                Some(line) => {
                    store.add(line);
                }
                None => {
                    let (code, message) = goods_skip_reason(item)
                        .unwrap_or(("INCOMPLETE_ROW", "goods row is incomplete"));
                    debug!(
                        event_name = "pricing.line.skipped",
                        section = "goods",
                        row = index,
                        code,
                        "goods row excluded from pricing"
                    );
                    skipped_rows.push(skipped(RequestSection::Goods, *index, code, message));
                }
            }
        }

        store.extend(normalized.custom);

        let quote_id = request
            .quote_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| QuoteId(id.to_string()))
            .unwrap_or_else(QuoteId::generate);

        Ok(QuoteDraft { quote_id, store, skipped_rows, edit_outcomes: Vec::new() })
    }

    fn totals(&self, lines: &[LineItem]) -> Result<QuoteTotals, PricingError> {
        self.totals_engine.totals(lines)
    }

    fn currency(&self) -> &str {
        &self.currency
    }
}

/// Applies one draft edit; `line` is the position in the store's current order.
pub fn apply_edit(store: &mut LineItemStore, edit: &DraftEdit) -> EditOutcome {
    let line = match edit {
        DraftEdit::Quantity { line, .. }
        | DraftEdit::UnitPrice { line, .. }
        | DraftEdit::Total { line, .. }
        | DraftEdit::Remove { line } => *line,
    };
    let Some(id) = store.id_at(line).cloned() else {
        warn!(event_name = "pricing.draft.edit_missing", line, "draft edit targets no line");
        return EditOutcome::Missing;
    };

    match edit {
        DraftEdit::Quantity { value, .. } => match count_problem(value) {
            Some((code, _)) => {
                warn!(
                    event_name = "pricing.draft.edit_rejected",
                    line,
                    code,
                    "quantity edit rejected"
                );
                EditOutcome::Rejected
            }
            None => store.update_quantity(&id, coerce_count(value)),
        },
        DraftEdit::UnitPrice { value, .. } => store.update_unit_price(&id, coerce_decimal(value)),
        DraftEdit::Total { value, .. } => store.update_total(&id, coerce_decimal(value)),
        DraftEdit::Remove { .. } => match store.remove(&id) {
            Some(_) => EditOutcome::Applied,
            None => EditOutcome::Missing,
        },
    }
}
