use thiserror::Error;

use crate::config::ConfigError;

/// Failures raised by the pricing components themselves.
///
/// Both kinds are non-retryable: pricing is pure computation, so the same
/// input always fails the same way.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("pricing configuration defect: {0}")]
    Configuration(String),
    #[error("invalid value `{value}` for {field}")]
    InvalidParameter { field: &'static str, value: String },
}

impl PricingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_parameter(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidParameter { field, value: value.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("input failure: {0}")]
    Input(String),
}

impl From<ConfigError> for ApplicationError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Pricing(PricingError::Configuration(_)) => "pricing_configuration",
            Self::Pricing(PricingError::InvalidParameter { .. }) => "invalid_parameter",
            Self::Configuration(_) => "config_validation",
            Self::Input(_) => "input",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Input(_) => 3,
            Self::Pricing(PricingError::InvalidParameter { .. }) => 4,
            Self::Pricing(PricingError::Configuration(_)) => 5,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Input(_) | Self::Pricing(PricingError::InvalidParameter { .. }) => {
                "The quote request could not be priced. Check inputs and try again."
            }
            Self::Configuration(_) | Self::Pricing(PricingError::Configuration(_)) => {
                "The pricing policy is misconfigured. Contact the quote desk administrator."
            }
        }
    }
}
