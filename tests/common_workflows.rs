//! Integration tests for common approval-relay workflows.
//!
//! The full stack is wired through `RelayApp` with in-memory collaborator
//! doubles standing in for the approval platform and the QR service.

use approval_relay::prelude::*;
use relay_handlers::testing::{FakePlatform, FakeQrGenerator, FixedAmountExtractor, StaticValidator};
use relay_handlers::{PaymentDetails, PaymentKind, QR_HANDLER, VALIDATION_HANDLER, Violation};
use serde_json::{Value, json};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    platform: Arc<FakePlatform>,
    generator: Arc<FakeQrGenerator>,
    validator: Arc<StaticValidator>,
    app: RelayApp,
}

fn payload(value: Value) -> Payload {
    value.as_object().cloned().unwrap_or_default()
}

fn nodes() -> NodeConfig {
    NodeConfig::new().with_node("N1", NodeRule::payment_only("payment", "Payment amount"))
}

fn harness_with(settings: Settings, extractor: Arc<dyn AmountExtractor>) -> Harness {
    let platform = Arc::new(FakePlatform::new().with_instance(
        relay_handlers::ApprovalInstance::new("I1", "PENDING")
            .with_serial_number("2024-0042")
            .with_task("N1", "PENDING"),
    ));
    let generator = Arc::new(FakeQrGenerator::new());
    let validator = Arc::new(StaticValidator::default());
    let collaborators = Collaborators::new(
        platform.clone(),
        generator.clone(),
        extractor,
        validator.clone(),
    );
    let app = RelayApp::new(settings, nodes(), collaborators).unwrap();

    Harness {
        platform,
        generator,
        validator,
        app,
    }
}

fn harness() -> Harness {
    harness_with(
        Settings::default(),
        Arc::new(FixedAmountExtractor::new(Some(PaymentDetails::new(
            PaymentKind::Payment,
            2_500_000,
        )))),
    )
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_event_without_handlers_returns_empty_report() {
    let h = harness();

    let report = h
        .app
        .bus()
        .publish("approval.instance.created", payload(json!({"instance_code": "I1"})))
        .await;

    assert!(report.is_empty());
    assert_eq!(h.platform.fetches(), 0);
}

#[tokio::test]
async fn test_every_handler_reports_an_outcome() {
    let h = harness();

    let report = h
        .app
        .handle_webhook(payload(json!({"instance_code": "I1", "node": "N1"})))
        .await;

    assert_eq!(report.len(), 2);
    assert!(report.get(QR_HANDLER).is_some_and(Outcome::is_success));
    assert_eq!(
        report.get(VALIDATION_HANDLER),
        Some(&Outcome::skipped("no errors"))
    );
    assert!(h.platform.messages().is_empty());
}

#[tokio::test]
async fn test_unknown_node_skips_qr_but_not_validation() {
    let h = harness();
    h.validator
        .set(vec![Violation::new("missing_invoice", "Invoice attachment is required")]);

    let report = h
        .app
        .handle_webhook(payload(json!({"instance_code": "I1", "node": "N-unknown"})))
        .await;

    assert_eq!(report.get(QR_HANDLER), Some(&Outcome::skipped("invalid node")));
    assert!(report.get(VALIDATION_HANDLER).is_some_and(Outcome::is_success));
    assert_eq!(h.generator.calls(), 0);
    assert_eq!(h.platform.messages().len(), 1);
    assert!(h.platform.messages()[0].contains("2024-0042"));
}

#[tokio::test]
async fn test_duplicate_delivery_generates_qr_once() {
    let h = harness();
    let body = json!({"instance_code": "I1", "node": "N1"});

    let first = h.app.handle_webhook(payload(body.clone())).await;
    let second = h.app.handle_webhook(payload(body)).await;

    assert!(first.get(QR_HANDLER).is_some_and(Outcome::is_success));
    assert_eq!(second.get(QR_HANDLER), Some(&Outcome::skipped("duplicate")));
    assert_eq!(h.generator.calls(), 1);
    assert_eq!(h.platform.comments().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_eligible_again_after_ttl() {
    let settings = Settings {
        idempotency_ttl_secs: 120,
        ..Settings::default()
    };
    let h = harness_with(
        settings,
        Arc::new(FixedAmountExtractor::new(Some(PaymentDetails::new(
            PaymentKind::Payment,
            1_000,
        )))),
    );
    let body = json!({"instance_code": "I1", "node": "N1"});

    h.app.handle_webhook(payload(body.clone())).await;
    tokio::time::advance(Duration::from_secs(121)).await;
    let again = h.app.handle_webhook(payload(body)).await;

    assert!(again.get(QR_HANDLER).is_some_and(Outcome::is_success));
    assert_eq!(h.generator.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_webhooks_for_different_instances() {
    let h = harness();
    for code in ["I2", "I3", "I4"] {
        h.platform.put_instance(
            relay_handlers::ApprovalInstance::new(code, "PENDING").with_task("N1", "PENDING"),
        );
    }

    let reports = futures::future::join_all(["I1", "I2", "I3", "I4"].map(|code| {
        h.app
            .handle_webhook(payload(json!({"instance_code": code, "node": "N1"})))
    }))
    .await;

    assert!(
        reports
            .iter()
            .all(|r| r.get(QR_HANDLER).is_some_and(Outcome::is_success))
    );
    assert_eq!(h.generator.calls(), 4);
    assert_eq!(h.app.cache_status().active.len(), 4);
    assert_eq!(h.app.history(10).len(), 4);
}

// =============================================================================
// Fault isolation
// =============================================================================

struct PanickingExtractor;

impl AmountExtractor for PanickingExtractor {
    fn extract(
        &self,
        _form: &Value,
        _rule: &NodeRule,
    ) -> relay_handlers::CollaboratorResult<Option<PaymentDetails>> {
        panic!("form layout changed")
    }
}

#[tokio::test]
async fn test_panicking_handler_does_not_affect_sibling() {
    let h = harness_with(Settings::default(), Arc::new(PanickingExtractor));
    h.validator
        .set(vec![Violation::new("amount_mismatch", "Advance exceeds budget")]);

    let report = h
        .app
        .handle_webhook(payload(json!({"instance_code": "I1", "node": "N1"})))
        .await;

    assert_eq!(
        report.get(QR_HANDLER),
        Some(&Outcome::failed("handler panicked: form layout changed"))
    );
    assert!(report.get(VALIDATION_HANDLER).is_some_and(Outcome::is_success));
}

#[tokio::test]
async fn test_upstream_failure_reported_per_handler() {
    let h = harness();
    h.platform.fail_fetches(true);

    let report = h
        .app
        .handle_webhook(payload(json!({"instance_code": "I1", "node": "N1"})))
        .await;

    assert_eq!(report.len(), 2);
    assert_eq!(report.failed(), 2);
    assert!(report.iter().all(|o| o.outcome.detail().contains("HTTP 503")));
}

#[tokio::test]
async fn test_missing_instance_code_skips_everywhere() {
    let h = harness();

    let report = h.app.handle_webhook(payload(json!({"node": "N1"}))).await;

    assert_eq!(report.skipped(), 2);
    assert_eq!(h.platform.fetches(), 0);
}

// =============================================================================
// Monitoring
// =============================================================================

#[tokio::test]
async fn test_history_and_cache_diagnostics() {
    let h = harness();
    h.app
        .handle_webhook(payload(json!({"instance_code": "I1", "node": "N1"})))
        .await;
    h.app
        .handle_webhook(payload(json!({"instance_code": "I2", "node": "N1"})))
        .await;

    let history = h.app.history(1);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event.get_str("instance_code"), Some("I2"));
    assert!(history[0].is_complete());

    let status = h.app.cache_status();
    let keys: Vec<_> = status.active.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, ["qr:I1:N1"]);

    assert_eq!(h.app.clear_cache(), vec!["qr:I1:N1".to_string()]);
    assert_eq!(h.app.cache_status().total_entries, 0);
}

#[tokio::test]
async fn test_registration_status_lists_domain_handlers() {
    let h = harness();
    let status = h.app.registration_status();

    assert_eq!(status.total_event_types, 1);
    assert_eq!(
        status.registrations[APPROVAL_INSTANCE_UPDATED],
        vec!["qr_generation.qr_generator", "validation.validation_alert"]
    );
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_app_from_node_rule_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
        [nodes.N7]
        name = "department_head_review"
        kind = "dual_detection"
        advance_field = "Advance amount"
        payment_field = "Payment amount"
        strategy = "detect_both_fields"
        "#
    )
    .unwrap();
    let nodes = NodeConfig::from_file(file.path()).unwrap();

    let platform = Arc::new(FakePlatform::new().with_instance(
        relay_handlers::ApprovalInstance::new("I7", "PENDING").with_task("N7", "PENDING"),
    ));
    let generator = Arc::new(FakeQrGenerator::new());
    let app = RelayApp::new(
        Settings::default(),
        nodes,
        Collaborators::new(
            platform.clone(),
            generator.clone(),
            Arc::new(FixedAmountExtractor::new(Some(
                PaymentDetails::new(PaymentKind::Advance, 500).with_round(2),
            ))),
            Arc::new(StaticValidator::default()),
        ),
    )
    .unwrap();

    let report = app
        .handle_webhook(payload(json!({"instance_code": "I7", "node": "N7"})))
        .await;

    assert!(report.get(QR_HANDLER).is_some_and(Outcome::is_success));
    assert_eq!(platform.uploads(), vec!["I7_advance2_qr.png".to_string()]);
    assert_eq!(generator.requests()[0].description, "advance2 I7");
}

#[test]
fn test_invalid_settings_rejected() {
    let settings = Settings {
        idempotency_ttl_secs: 0,
        ..Settings::default()
    };
    let result = RelayApp::new(
        settings,
        NodeConfig::new(),
        Collaborators::new(
            Arc::new(FakePlatform::new()),
            Arc::new(FakeQrGenerator::new()),
            Arc::new(FixedAmountExtractor::new(None)),
            Arc::new(StaticValidator::default()),
        ),
    );

    assert!(matches!(result, Err(AppError::Config(_))));
}
