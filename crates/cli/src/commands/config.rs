use std::env;
use std::fs;
use std::path::Path;

use cleanquote_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };
    let overridden = |flag: &str, set: bool| set.then(|| format!("override (--{flag})"));
    let overrides = &options.overrides;

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    lines.push(render_line(
        "pricing.currency",
        &config.pricing.currency,
        overridden("currency", overrides.currency.is_some())
            .unwrap_or_else(|| source("pricing.currency", &["CLEANQUOTE_CURRENCY"])),
    ));
    lines.push(render_line(
        "pricing.tax_rate",
        &config.pricing.tax_rate.normalize().to_string(),
        overridden("tax-rate", overrides.tax_rate.is_some())
            .unwrap_or_else(|| source("pricing.tax_rate", &["CLEANQUOTE_TAX_RATE"])),
    ));
    lines.push(render_line(
        "pricing.minimum_charge",
        &config.pricing.minimum_charge.normalize().to_string(),
        overridden("minimum-charge", overrides.minimum_charge.is_some())
            .unwrap_or_else(|| source("pricing.minimum_charge", &["CLEANQUOTE_MINIMUM_CHARGE"])),
    ));
    lines.push(render_line(
        "pricing.rounding_step",
        &config.pricing.rounding_step.normalize().to_string(),
        overridden("rounding-step", overrides.rounding_step.is_some())
            .unwrap_or_else(|| source("pricing.rounding_step", &["CLEANQUOTE_ROUNDING_STEP"])),
    ));

    let categories: Vec<&str> = config.rates.categories().map(|(key, _)| key).collect();
    lines.push(render_line("rates", &categories.join(", "), source("rates", &[])));

    let coefficients = &config.coefficients;
    let factor_lines = [
        ("coefficients.distance_threshold_km", coefficients.distance_threshold_km),
        ("coefficients.distance_factor", coefficients.distance_factor),
        ("coefficients.access.ground", coefficients.access.ground),
        ("coefficients.access.elevator", coefficients.access.elevator),
        ("coefficients.access.no_elevator", coefficients.access.no_elevator),
        ("coefficients.urgency.standard", coefficients.urgency.standard),
        ("coefficients.urgency.urgent", coefficients.urgency.urgent),
        ("coefficients.urgency.immediate", coefficients.urgency.immediate),
        ("coefficients.difficulty.standard", coefficients.difficulty.standard),
        ("coefficients.difficulty.difficult", coefficients.difficulty.difficult),
        ("coefficients.difficulty.extreme", coefficients.difficulty.extreme),
    ];
    for (key, value) in factor_lines {
        lines.push(render_line(key, &value.normalize().to_string(), source(key, &[])));
    }

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        overridden("log-level", overrides.log_level.is_some()).unwrap_or_else(|| {
            source("logging.level", &["CLEANQUOTE_LOGGING_LEVEL", "CLEANQUOTE_LOG_LEVEL"])
        }),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["CLEANQUOTE_LOGGING_FORMAT", "CLEANQUOTE_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var(env_key).is_ok_and(|value| !value.trim().is_empty()) {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
