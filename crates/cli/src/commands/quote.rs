use std::fs;
use std::path::Path;

use anyhow::Context;
use cleanquote_core::config::{AppConfig, LoadOptions};
use cleanquote_core::domain::quote::RequestSection;
use cleanquote_core::{
    ApplicationError, DeterministicQuoteEngine, PricedQuote, QuoteEngine, QuoteRequest,
};

use crate::commands::CommandResult;

const COMMAND: &str = "quote";

pub fn run(input: &Path, options: &LoadOptions, json_output: bool) -> CommandResult {
    match price(input, options) {
        Ok(priced) if json_output => match serde_json::to_string_pretty(&priced) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::from_error(
                COMMAND,
                &ApplicationError::Input(format!("failed to serialize priced quote: {error}")),
            ),
        },
        Ok(priced) => CommandResult { exit_code: 0, output: render_human(&priced) },
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

fn price(input: &Path, options: &LoadOptions) -> Result<PricedQuote, ApplicationError> {
    let config = AppConfig::load(options.clone())?;

    let request =
        load_request(input).map_err(|error| ApplicationError::Input(format!("{error:#}")))?;

    let engine = DeterministicQuoteEngine::from_policy(config.pricing_policy());
    Ok(engine.price_request(&request)?)
}

fn load_request(path: &Path) -> anyhow::Result<QuoteRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read quote request `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse quote request `{}`", path.display()))
}

fn render_human(priced: &PricedQuote) -> String {
    let currency = &priced.currency;
    let mut lines = vec![format!("quote {} ({currency})", priced.quote_id.0)];

    for (position, line) in priced.lines.iter().enumerate() {
        lines.push(format!(
            "{position:>3}. {} | {} x {} = {} {currency}",
            line.description,
            line.quantity,
            line.unit_price.round_dp(2),
            line.total_price.round_dp(2),
        ));
        if !line.detail.is_empty() {
            lines.push(format!("     {}", line.detail));
        }
        if let Some(adjustment) = &line.adjustment {
            lines.push(format!(
                "     manually adjusted (computed {} {currency})",
                adjustment.computed_total.round_dp(2)
            ));
        }
    }

    let totals = &priced.totals;
    lines.push(format!("subtotal:       {} {currency}", totals.sub_total.round_dp(2)));
    lines.push(format!("tax:            {} {currency}", totals.tax.round_dp(2)));
    lines.push(format!("total with tax: {} {currency}", totals.total_with_tax.round_dp(2)));
    if totals.minimum_applied {
        lines.push(format!("minimum charge applied: {} {currency}", totals.floored_total));
    }
    lines.push(format!("final price:    {} {currency}", totals.final_price.normalize()));

    for row in &priced.skipped_rows {
        let section = match row.section {
            RequestSection::Services => "services",
            RequestSection::Goods => "goods",
            RequestSection::Custom => "custom",
        };
        lines.push(format!("skipped {section}[{}] {}: {}", row.index, row.code, row.message));
    }

    lines.join("\n")
}
