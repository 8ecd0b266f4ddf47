use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpq::aggregator::AggregationPolicy;
use crate::cpq::coefficients::CoefficientTable;
use crate::cpq::rate_table::RateTable;
use crate::cpq::PricingPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub rates: RateTable,
    pub coefficients: CoefficientTable,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub currency: String,
    pub tax_rate: Decimal,
    pub minimum_charge: Decimal,
    pub rounding_step: Decimal,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub currency: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub minimum_charge: Option<Decimal>,
    pub rounding_step: Option<Decimal>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let aggregation = AggregationPolicy::default();
        Self {
            pricing: PricingConfig {
                currency: "EUR".to_string(),
                tax_rate: aggregation.tax_rate,
                minimum_charge: aggregation.minimum_charge,
                rounding_step: aggregation.rounding_step,
            },
            rates: RateTable::reference(),
            coefficients: CoefficientTable::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("cleanquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            currency: self.pricing.currency.clone(),
            aggregation: AggregationPolicy {
                tax_rate: self.pricing.tax_rate,
                minimum_charge: self.pricing.minimum_charge,
                rounding_step: self.pricing.rounding_step,
            },
            rates: self.rates.clone(),
            coefficients: self.coefficients,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(currency) = pricing.currency {
                self.pricing.currency = currency;
            }
            if let Some(tax_rate) = pricing.tax_rate {
                self.pricing.tax_rate = tax_rate;
            }
            if let Some(minimum_charge) = pricing.minimum_charge {
                self.pricing.minimum_charge = minimum_charge;
            }
            if let Some(rounding_step) = pricing.rounding_step {
                self.pricing.rounding_step = rounding_step;
            }
        }

        // A rate table in the file replaces the reference catalogue wholesale.
        if let Some(rates) = patch.rates {
            self.rates = rates;
        }

        if let Some(coefficients) = patch.coefficients {
            let table = &mut self.coefficients;
            if let Some(distance_threshold_km) = coefficients.distance_threshold_km {
                table.distance_threshold_km = distance_threshold_km;
            }
            if let Some(distance_factor) = coefficients.distance_factor {
                table.distance_factor = distance_factor;
            }
            if let Some(access) = coefficients.access {
                patch_value(&mut table.access.ground, access.ground);
                patch_value(&mut table.access.elevator, access.elevator);
                patch_value(&mut table.access.no_elevator, access.no_elevator);
            }
            if let Some(urgency) = coefficients.urgency {
                patch_value(&mut table.urgency.standard, urgency.standard);
                patch_value(&mut table.urgency.urgent, urgency.urgent);
                patch_value(&mut table.urgency.immediate, urgency.immediate);
            }
            if let Some(difficulty) = coefficients.difficulty {
                patch_value(&mut table.difficulty.standard, difficulty.standard);
                patch_value(&mut table.difficulty.difficult, difficulty.difficult);
                patch_value(&mut table.difficulty.extreme, difficulty.extreme);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CLEANQUOTE_CURRENCY") {
            self.pricing.currency = value;
        }
        if let Some(value) = read_env("CLEANQUOTE_TAX_RATE") {
            self.pricing.tax_rate = parse_decimal("CLEANQUOTE_TAX_RATE", &value)?;
        }
        if let Some(value) = read_env("CLEANQUOTE_MINIMUM_CHARGE") {
            self.pricing.minimum_charge = parse_decimal("CLEANQUOTE_MINIMUM_CHARGE", &value)?;
        }
        if let Some(value) = read_env("CLEANQUOTE_ROUNDING_STEP") {
            self.pricing.rounding_step = parse_decimal("CLEANQUOTE_ROUNDING_STEP", &value)?;
        }

        let log_level =
            read_env("CLEANQUOTE_LOGGING_LEVEL").or_else(|| read_env("CLEANQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CLEANQUOTE_LOGGING_FORMAT").or_else(|| read_env("CLEANQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(currency) = overrides.currency {
            self.pricing.currency = currency;
        }
        if let Some(tax_rate) = overrides.tax_rate {
            self.pricing.tax_rate = tax_rate;
        }
        if let Some(minimum_charge) = overrides.minimum_charge {
            self.pricing.minimum_charge = minimum_charge;
        }
        if let Some(rounding_step) = overrides.rounding_step {
            self.pricing.rounding_step = rounding_step;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        self.rates.validate().map_err(ConfigError::Validation)?;
        self.coefficients.validate().map_err(ConfigError::Validation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cleanquote.toml"), PathBuf::from("config/cleanquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    let currency = pricing.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "pricing.currency must be a three-letter ISO code such as EUR (got `{currency}`)"
        )));
    }

    if pricing.tax_rate < Decimal::ZERO || pricing.tax_rate > dec!(1) {
        return Err(ConfigError::Validation(
            "pricing.tax_rate must be a fraction in range 0..=1 (0.20 means 20%)".to_string(),
        ));
    }

    if pricing.minimum_charge < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.minimum_charge must not be negative".to_string(),
        ));
    }

    if pricing.rounding_step <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.rounding_step must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn patch_value(target: &mut Decimal, value: Option<Decimal>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    rates: Option<RateTable>,
    coefficients: Option<CoefficientPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    currency: Option<String>,
    tax_rate: Option<Decimal>,
    minimum_charge: Option<Decimal>,
    rounding_step: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct CoefficientPatch {
    distance_threshold_km: Option<Decimal>,
    distance_factor: Option<Decimal>,
    access: Option<AccessPatch>,
    urgency: Option<UrgencyPatch>,
    difficulty: Option<DifficultyPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AccessPatch {
    ground: Option<Decimal>,
    elevator: Option<Decimal>,
    no_elevator: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct UrgencyPatch {
    standard: Option<Decimal>,
    urgent: Option<Decimal>,
    immediate: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct DifficultyPatch {
    standard: Option<Decimal>,
    difficult: Option<Decimal>,
    extreme: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
