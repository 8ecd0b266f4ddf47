use cleanquote_core::config::{AppConfig, LoadOptions};
use cleanquote_core::cpq::rate_table::CategoryRates;
use cleanquote_core::{ApplicationError, PricingError, RateTable, ServiceCategory};

use crate::commands::CommandResult;

const COMMAND: &str = "rates";

pub fn run(category: Option<&str>, options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error(COMMAND, &ApplicationError::from(error)),
    };

    match render(&config.rates, category) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::from_error(COMMAND, &ApplicationError::from(error)),
    }
}

fn render(rates: &RateTable, category: Option<&str>) -> Result<String, PricingError> {
    let mut lines =
        vec!["rate table (per m², first tier whose threshold covers the area):".to_string()];

    match category {
        Some(key) => {
            let key = key.trim().to_lowercase();
            let entry = rates.get(&ServiceCategory::new(key.clone())).ok_or_else(|| {
                PricingError::configuration(format!("no rate table for category `{key}`"))
            })?;
            render_category(&mut lines, &key, entry);
        }
        None => {
            for (key, entry) in rates.categories() {
                render_category(&mut lines, key, entry);
            }
        }
    }

    Ok(lines.join("\n"))
}

fn render_category(lines: &mut Vec<String>, key: &str, entry: &CategoryRates) {
    match &entry.label {
        Some(label) => lines.push(format!("{key} ({label})")),
        None => lines.push(key.to_string()),
    }

    let last = entry.tiers.len().saturating_sub(1);
    for (position, tier) in entry.tiers.iter().enumerate() {
        let suffix = if position == last { ", also beyond" } else { "" };
        lines.push(format!(
            "  - up to {} m²{suffix}: {}",
            tier.up_to_area.normalize(),
            tier.rate.normalize()
        ));
    }
}
