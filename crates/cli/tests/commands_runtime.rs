use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use cleanquote_cli::commands::{config, doctor, quote, rates};
use cleanquote_core::config::{ConfigOverrides, LoadOptions};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tempfile::TempDir;

#[test]
fn quote_prices_request_file_as_json() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_request(
            &dir,
            json!({
                "quoteId": "Q-2041",
                "services": [{
                    "category": "standard_cleaning",
                    "area": "50",
                    "floorAccess": "no_elevator",
                    "urgency": "immediate"
                }],
                "goods": [{ "name": "Mop", "quantity": 3, "unitPrice": 47 }],
                "custom": [{ "description": "Key pickup", "quantity": 1, "unitPrice": "25" }]
            }),
        );

        let result = quote::run(&input, &LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "expected priced quote: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["quote_id"], "Q-2041");
        assert_eq!(payload["currency"], "EUR");
        assert_eq!(payload["lines"].as_array().map(Vec::len), Some(3));
        assert_eq!(decimal_at(&payload["lines"][0]["total_price"]), dec!(1872));
        assert_eq!(decimal_at(&payload["lines"][1]["total_price"]), dec!(141));
        assert_eq!(decimal_at(&payload["totals"]["sub_total"]), dec!(2038));
        assert_eq!(decimal_at(&payload["totals"]["final_price"]), dec!(2450));
    });
}

#[test]
fn quote_reports_skipped_rows_and_edit_outcomes() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_request(
            &dir,
            json!({
                "services": [
                    { "category": "office", "area": 120 },
                    { "category": "", "area": 40 }
                ],
                "goods": [
                    { "name": "Mop", "quantity": 3, "unitPrice": 47 },
                    { "name": "Bucket", "quantity": 0, "unitPrice": 12 }
                ],
                "edits": [
                    { "op": "quantity", "line": 0, "value": 2 },
                    { "op": "quantity", "line": 1, "value": 4 }
                ]
            }),
        );

        let result = quote::run(&input, &LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "expected priced quote: {}", result.output);

        let payload = parse_payload(&result.output);
        let skipped = payload["skipped_rows"].as_array().expect("skipped rows array");
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0]["section"], "services");
        assert_eq!(skipped[0]["code"], "BLANK_CATEGORY");
        assert_eq!(skipped[1]["section"], "goods");
        assert_eq!(skipped[1]["code"], "NON_POSITIVE_QUANTITY");

        assert_eq!(payload["edit_outcomes"], json!(["locked", "applied"]));
        assert_eq!(decimal_at(&payload["lines"][1]["total_price"]), dec!(188));
    });
}

#[test]
fn quote_human_output_lists_lines_and_final_price() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_request(
            &dir,
            json!({ "goods": [{ "name": "Mop", "quantity": 3, "unitPrice": 47 }] }),
        );

        let result = quote::run(&input, &LoadOptions::default(), false);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("Mop"), "{}", result.output);
        assert!(result.output.contains("minimum charge applied"), "{}", result.output);
        assert!(result.output.contains("final price:    500 EUR"), "{}", result.output);
    });
}

#[test]
fn quote_honours_config_file_policy() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let config_path = write_config(
            &dir,
            r#"
[pricing]
currency = "CHF"
tax_rate = 0.1
minimum_charge = 300
rounding_step = 5
"#,
        );
        let input = write_request(
            &dir,
            json!({ "goods": [{ "name": "Mop", "quantity": 3, "unitPrice": 47 }] }),
        );

        let result = quote::run(&input, &file_options(&config_path), true);
        assert_eq!(result.exit_code, 0, "expected priced quote: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["currency"], "CHF");
        assert_eq!(payload["totals"]["minimum_applied"], true);
        assert_eq!(decimal_at(&payload["totals"]["final_price"]), dec!(300));
    });
}

#[test]
fn quote_with_unknown_category_is_a_pricing_configuration_failure() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input =
            write_request(&dir, json!({ "services": [{ "category": "pool", "area": 30 }] }));

        let result = quote::run(&input, &LoadOptions::default(), true);
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "pricing_configuration");
    });
}

#[test]
fn quote_with_unrecognised_urgency_is_an_invalid_parameter() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_request(
            &dir,
            json!({ "services": [{ "category": "office", "area": 30, "urgency": "asap" }] }),
        );

        let result = quote::run(&input, &LoadOptions::default(), true);
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_parameter");
    });
}

#[test]
fn quote_with_missing_input_is_an_input_failure() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = quote::run(&dir.path().join("absent.json"), &LoadOptions::default(), true);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "input");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("could not read quote request"), "{message}");
    });
}

#[test]
fn quote_returns_config_failure_for_invalid_env() {
    with_env(&[("CLEANQUOTE_ROUNDING_STEP", "0")], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_request(&dir, json!({}));

        let result = quote::run(&input, &LoadOptions::default(), true);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn quote_with_missing_explicit_config_fails() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_request(&dir, json!({}));

        let missing = dir.path().join("absent.toml");
        let result = quote::run(&input, &file_options(&missing), true);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn quote_flag_overrides_win_over_env_and_file() {
    with_env(&[("CLEANQUOTE_MINIMUM_CHARGE", "400")], || {
        let dir = TempDir::new().expect("temp dir");
        let config_path = write_config(&dir, "[pricing]\ntax_rate = 0.1\n");
        let input = write_request(
            &dir,
            json!({ "goods": [{ "name": "Mop", "quantity": 3, "unitPrice": 47 }] }),
        );

        let options = LoadOptions {
            overrides: ConfigOverrides {
                minimum_charge: Some(dec!(100)),
                tax_rate: Some(Decimal::ZERO),
                ..ConfigOverrides::default()
            },
            ..file_options(&config_path)
        };
        let result = quote::run(&input, &options, true);
        assert_eq!(result.exit_code, 0, "expected priced quote: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["totals"]["minimum_applied"], false);
        assert_eq!(decimal_at(&payload["totals"]["tax"]), Decimal::ZERO);
        assert_eq!(decimal_at(&payload["totals"]["final_price"]), dec!(140));
    });
}

#[test]
fn quote_skips_rows_whose_amount_overflows() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let input = write_request(
            &dir,
            json!({
                "custom": [
                    { "description": "Bulk", "quantity": 4000000000u64, "unitPrice": "1e20" },
                    { "description": "Key pickup", "quantity": 1, "unitPrice": 25 }
                ],
                "goods": [{ "name": "Mop", "quantity": "2.5", "unitPrice": 47 }]
            }),
        );

        let result = quote::run(&input, &LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "expected priced quote: {}", result.output);

        let payload = parse_payload(&result.output);
        let codes: Vec<&str> = payload["skipped_rows"]
            .as_array()
            .expect("skipped rows array")
            .iter()
            .filter_map(|row| row["code"].as_str())
            .collect();
        assert_eq!(codes, ["FRACTIONAL_QUANTITY", "AMOUNT_OUT_OF_RANGE"]);
        assert_eq!(decimal_at(&payload["totals"]["sub_total"]), dec!(25));
    });
}

#[test]
fn rates_lists_tiers_for_one_category() {
    with_env(&[], || {
        let result = rates::run(Some("Office"), &LoadOptions::default());
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("office"), "{}", result.output);
        assert!(result.output.contains("  - up to 200 m²: 9"), "{}", result.output);
        assert!(result.output.contains("  - up to 1000 m², also beyond: 6"), "{}", result.output);
        assert!(!result.output.contains("window"), "{}", result.output);
    });
}

#[test]
fn rates_rejects_unknown_category() {
    with_env(&[], || {
        let result = rates::run(Some("pool"), &LoadOptions::default());
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "rates");
        assert_eq!(payload["error_class"], "pricing_configuration");
    });
}

#[test]
fn config_attributes_env_and_file_sources() {
    with_env(&[("CLEANQUOTE_TAX_RATE", "0.1")], || {
        let dir = TempDir::new().expect("temp dir");
        let config_path = write_config(&dir, "[pricing]\nminimum_charge = 300\n");

        let output = config::run(&file_options(&config_path));
        assert!(
            output.contains("- pricing.tax_rate = 0.1 (source: env (CLEANQUOTE_TAX_RATE))"),
            "{output}"
        );
        let file_line = format!(
            "- pricing.minimum_charge = 300 (source: file ({}))",
            config_path.display()
        );
        assert!(output.contains(&file_line), "{output}");
        assert!(output.contains("- pricing.rounding_step = 10 (source: default)"), "{output}");
    });
}

#[test]
fn config_attributes_flag_overrides() {
    with_env(&[("CLEANQUOTE_TAX_RATE", "0.1")], || {
        let options = LoadOptions {
            overrides: ConfigOverrides {
                tax_rate: Some(dec!(0.07)),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        };

        let output = config::run(&options);
        assert!(
            output.contains("- pricing.tax_rate = 0.07 (source: override (--tax-rate))"),
            "{output}"
        );
        assert!(
            output.contains("- logging.level = debug (source: override (--log-level))"),
            "{output}"
        );
    });
}

#[test]
fn doctor_reports_pass_with_default_policy() {
    with_env(&[], || {
        let result = doctor::run(&LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let checks = payload["checks"].as_array().expect("checks array");
        let names: Vec<&str> = checks.iter().filter_map(|check| check["name"].as_str()).collect();
        assert_eq!(
            names,
            [
                "config_validation",
                "rate_table_integrity",
                "coefficient_table_integrity",
                "sample_quote"
            ]
        );
    });
}

#[test]
fn doctor_skips_table_checks_when_config_invalid() {
    with_env(&[("CLEANQUOTE_TAX_RATE", "2")], || {
        let result = doctor::run(&LoadOptions::default(), true);
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn decimal_at(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => Decimal::from_str(raw).expect("decimal string"),
        Value::Number(number) => Decimal::from_str(&number.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

fn file_options(path: &Path) -> LoadOptions {
    LoadOptions {
        config_path: Some(path.to_path_buf()),
        require_file: true,
        ..LoadOptions::default()
    }
}

fn write_request(dir: &TempDir, body: Value) -> PathBuf {
    let path = dir.path().join("request.json");
    fs::write(&path, body.to_string()).expect("request file should be written");
    path
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("cleanquote.toml");
    fs::write(&path, body).expect("config file should be written");
    path
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CLEANQUOTE_CURRENCY",
        "CLEANQUOTE_TAX_RATE",
        "CLEANQUOTE_MINIMUM_CHARGE",
        "CLEANQUOTE_ROUNDING_STEP",
        "CLEANQUOTE_LOGGING_LEVEL",
        "CLEANQUOTE_LOGGING_FORMAT",
        "CLEANQUOTE_LOG_LEVEL",
        "CLEANQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
