//! Integration tests for relay-config

use relay_config::*;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_settings_from_toml_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
        idempotency_ttl_secs = 60
        history_capacity = 10
        enable_validation_alerts = false
        "#
    )
    .unwrap();

    let settings = Settings::from_file(file.path()).unwrap();
    assert_eq!(settings.idempotency_ttl(), Duration::from_secs(60));
    assert_eq!(settings.history_capacity, 10);
    assert!(!settings.enable_validation_alerts);
    // untouched fields keep defaults
    assert_eq!(settings.qr_template, "compact2");
}

#[test]
fn test_settings_file_failing_validation() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"history_capacity": 0}}"#).unwrap();

    assert!(matches!(
        Settings::from_file(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_node_config_from_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{
            "nodes": {{
                "node-a": {{
                    "name": "cashier",
                    "kind": "payment_only",
                    "payment_field": "Amount",
                    "strategy": "payment_field_only"
                }}
            }}
        }}"#
    )
    .unwrap();

    let config = NodeConfig::from_file(file.path()).unwrap();
    let rule = config.get("node-a").unwrap();
    assert_eq!(rule.name, "cashier");
    assert_eq!(rule.required_status, "PENDING");
}

#[test]
fn test_unsupported_extension() {
    let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    assert!(matches!(
        NodeConfig::from_file(file.path()),
        Err(ConfigError::LoadError(_))
    ));
}
