//! Approval platform data as the handlers see it

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Event type published whenever an approval instance changes.
pub const APPROVAL_INSTANCE_UPDATED: &str = "approval.instance.updated";

/// One workflow task of an approval instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub node_id: String,
    #[serde(default)]
    pub node_name: Option<String>,
    pub status: String,
}

/// Authoritative state of an approval instance, fetched from the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalInstance {
    pub code: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    pub status: String,
    /// Raw form widgets, as returned by the platform
    #[serde(default)]
    pub form: Value,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl ApprovalInstance {
    pub fn new(code: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            serial_number: None,
            status: status.into(),
            form: Value::Array(Vec::new()),
            tasks: Vec::new(),
        }
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_form(mut self, form: Value) -> Self {
        self.form = form;
        self
    }

    pub fn with_task(mut self, node_id: impl Into<String>, status: impl Into<String>) -> Self {
        self.tasks.push(Task {
            node_id: node_id.into(),
            node_name: None,
            status: status.into(),
        });
        self
    }

    /// Whether any task on `node_id` is in `status` (case-insensitive).
    ///
    /// A node can carry several tasks when it is visited more than once.
    pub fn has_task_in_status(&self, node_id: &str, status: &str) -> bool {
        self.tasks
            .iter()
            .any(|t| t.node_id == node_id && t.status.eq_ignore_ascii_case(status))
    }

    /// Serial number if known, otherwise the instance code.
    pub fn display_id(&self) -> &str {
        self.serial_number.as_deref().unwrap_or(&self.code)
    }
}

/// Reference to a file uploaded to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub key: String,
    pub filename: String,
}

/// Comment posted on an approval instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub text: String,
    pub image: Option<FileRef>,
    pub user_id: String,
}

/// Which payment a QR code is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Advance,
    Payment,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Advance => "advance",
            PaymentKind::Payment => "payment",
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount and beneficiary pulled out of an instance form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub kind: PaymentKind,
    /// Whole currency units
    pub amount: i64,
    /// Advance round, when an instance pays several advances
    #[serde(default)]
    pub round: Option<u32>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub bank_id: Option<String>,
}

impl PaymentDetails {
    pub fn new(kind: PaymentKind, amount: i64) -> Self {
        Self {
            kind,
            amount,
            round: None,
            account_number: None,
            account_name: None,
            bank_id: None,
        }
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    /// `advance`, `advance2`, `payment`, ...
    pub fn qr_type(&self) -> String {
        match self.round {
            Some(round) if round > 1 => format!("{}{}", self.kind, round),
            _ => self.kind.to_string(),
        }
    }
}

/// Input to the QR generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentQrRequest {
    pub instance_code: String,
    pub amount: i64,
    pub description: String,
    pub template: String,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub bank_id: Option<String>,
}

/// A business rule the instance breaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Violation {
    /// Rule identifier, e.g. `missing_invoice`
    pub kind: String,
    pub message: String,
}

impl Violation {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_lookup() {
        let instance = ApprovalInstance::new("I1", "PENDING")
            .with_task("N1", "APPROVED")
            .with_task("N1", "pending")
            .with_task("N2", "PENDING");

        assert!(instance.has_task_in_status("N1", "PENDING"));
        assert!(instance.has_task_in_status("N1", "APPROVED"));
        assert!(!instance.has_task_in_status("N2", "APPROVED"));
        assert!(!instance.has_task_in_status("N3", "PENDING"));
    }

    #[test]
    fn test_qr_type_labels() {
        assert_eq!(PaymentDetails::new(PaymentKind::Payment, 10).qr_type(), "payment");
        assert_eq!(
            PaymentDetails::new(PaymentKind::Advance, 10).with_round(1).qr_type(),
            "advance"
        );
        assert_eq!(
            PaymentDetails::new(PaymentKind::Advance, 10).with_round(2).qr_type(),
            "advance2"
        );
    }

    #[test]
    fn test_display_id_prefers_serial() {
        let instance = ApprovalInstance::new("I1", "PENDING");
        assert_eq!(instance.display_id(), "I1");
        assert_eq!(instance.with_serial_number("2024-001").display_id(), "2024-001");
    }

    #[test]
    fn test_instance_deserializes_with_defaults() {
        let instance: ApprovalInstance =
            serde_json::from_value(serde_json::json!({"code": "I1", "status": "PENDING"})).unwrap();
        assert!(instance.tasks.is_empty());
        assert_eq!(instance.form, Value::Null);
    }
}
