pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;

pub use cpq::aggregator::{compute_totals, AggregationPolicy, QuoteAggregator, TotalsEngine};
pub use cpq::coefficients::{CoefficientResolver, CoefficientSource, CoefficientTable, Coefficients};
pub use cpq::goods_line::GoodsLineBuilder;
pub use cpq::intake::{DraftEdit, QuoteRequest};
pub use cpq::line_store::{LineEdit, LineItemStore};
pub use cpq::rate_table::{RateSource, RateTable, RateTier};
pub use cpq::service_line::ServiceLineBuilder;
pub use cpq::{DeterministicQuoteEngine, PricingPolicy, QuoteDraft, QuoteEngine};
pub use domain::goods::GoodsItem;
pub use domain::line_item::{EditOutcome, LineItem, LineItemId, LineOrigin};
pub use domain::quote::{PricedQuote, QuoteId, QuoteTotals, SkippedRow};
pub use domain::service::{Difficulty, FloorAccess, ServiceCategory, ServiceSpec, Urgency};
pub use errors::{ApplicationError, PricingError};
