use cleanquote_core::config::{AppConfig, LoadOptions};
use cleanquote_core::{
    DeterministicQuoteEngine, QuoteEngine, QuoteRequest, RateSource, ServiceCategory,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code when any readiness check fails.
const DOCTOR_FAILURE_EXIT: u8 = 6;

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { DOCTOR_FAILURE_EXIT };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_rate_table(&config));
            checks.push(check_coefficient_table(&config));
            checks.push(check_sample_quote(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["rate_table_integrity", "coefficient_table_integrity", "sample_quote"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Every category must price an area inside and beyond its tier range.
fn check_rate_table(config: &AppConfig) -> DoctorCheck {
    let mut priced = 0usize;
    for (key, entry) in config.rates.categories() {
        let category = ServiceCategory::new(key);
        let beyond_last =
            entry.tiers.last().and_then(|tier| tier.up_to_area.checked_mul(Decimal::TWO));
        let areas = entry.tiers.iter().map(|tier| tier.up_to_area).chain(beyond_last);

        for area in areas {
            if let Err(error) = config.rates.base_rate(&category, area) {
                return DoctorCheck {
                    name: "rate_table_integrity",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                };
            }
        }
        priced += 1;
    }

    DoctorCheck {
        name: "rate_table_integrity",
        status: CheckStatus::Pass,
        details: format!("{priced} service categories priced at every tier"),
    }
}

fn check_coefficient_table(config: &AppConfig) -> DoctorCheck {
    match config.coefficients.validate() {
        Ok(()) => {
            let table = &config.coefficients;
            let worst_case = table
                .distance_factor
                .checked_mul(table.access.no_elevator.max(table.access.elevator))
                .and_then(|factor| {
                    factor.checked_mul(table.urgency.immediate.max(table.urgency.urgent))
                })
                .and_then(|factor| {
                    factor.checked_mul(table.difficulty.extreme.max(table.difficulty.difficult))
                });
            match worst_case {
                Some(ceiling) => DoctorCheck {
                    name: "coefficient_table_integrity",
                    status: CheckStatus::Pass,
                    details: format!(
                        "all factors >= 1.0; combined ceiling x{}",
                        ceiling.normalize()
                    ),
                },
                None => DoctorCheck {
                    name: "coefficient_table_integrity",
                    status: CheckStatus::Fail,
                    details: "combined factors overflow the decimal range".to_string(),
                },
            }
        }
        Err(error) => DoctorCheck {
            name: "coefficient_table_integrity",
            status: CheckStatus::Fail,
            details: error,
        },
    }
}

/// Prices a one-row quote against the first category and checks the totals
/// contract: a multiple of the rounding step and not under the minimum charge.
fn check_sample_quote(config: &AppConfig) -> DoctorCheck {
    let Some((category, _)) = config.rates.categories().next() else {
        return DoctorCheck {
            name: "sample_quote",
            status: CheckStatus::Skipped,
            details: "no service categories configured".to_string(),
        };
    };

    let request = match serde_json::from_value::<QuoteRequest>(json!({
        "quote_id": "doctor-sample",
        "services": [{ "category": category, "area": 42 }],
    })) {
        Ok(request) => request,
        Err(error) => {
            return DoctorCheck {
                name: "sample_quote",
                status: CheckStatus::Fail,
                details: format!("sample request did not deserialize: {error}"),
            }
        }
    };

    let engine = DeterministicQuoteEngine::from_policy(config.pricing_policy());
    match engine.price_request(&request) {
        Ok(priced) => {
            let pricing = &config.pricing;
            let final_price = priced.totals.final_price;
            let on_step = (final_price % pricing.rounding_step).is_zero();
            if on_step && final_price >= pricing.minimum_charge {
                DoctorCheck {
                    name: "sample_quote",
                    status: CheckStatus::Pass,
                    details: format!(
                        "42 m² of {category} prices to {} {}",
                        final_price.normalize(),
                        priced.currency
                    ),
                }
            } else {
                DoctorCheck {
                    name: "sample_quote",
                    status: CheckStatus::Fail,
                    details: format!("final price {final_price} breaks the totals contract"),
                }
            }
        }
        Err(error) => DoctorCheck {
            name: "sample_quote",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
