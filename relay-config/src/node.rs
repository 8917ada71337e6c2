//! Workflow node rules.
//!
//! A [`NodeConfig`] maps a workflow node id to the [`NodeRule`] describing
//! whether and how the QR handler acts when an event names that node. It is
//! read-only input; handlers never mutate it.
//!
//! File layout (TOML shown, JSON uses the same shape):
//!
//! ```toml
//! [nodes.30e5338b60587c64]
//! name = "department_head_review"
//! kind = "dual_detection"
//! advance_field = "Advance amount"
//! payment_field = "Payment amount"
//! strategy = "detect_both_fields"
//! required_status = "PENDING"
//!
//! [[nodes.f23535375a26847e.additional_conditions]]
//! node_id = "ef83b231885a1a77"
//! required_status = "PENDING"
//! ```

use crate::{ConfigError, ConfigLoader, ConfigValidator, Result, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What kind of amount a node can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Advance or payment, decided from which field is filled in.
    DualDetection,
    /// Payment only.
    PaymentOnly,
}

/// How the amount field is picked for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    DetectBothFields,
    PaymentFieldOnly,
}

/// Another node that must be in a given status for a rule to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCondition {
    pub node_id: String,
    pub required_status: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Rule for one workflow node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRule {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub advance_field: Option<String>,
    #[serde(default)]
    pub payment_field: Option<String>,
    pub strategy: Strategy,
    #[serde(default = "default_required_status")]
    pub required_status: String,
    #[serde(default)]
    pub additional_conditions: Vec<NodeCondition>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_required_status() -> String {
    "PENDING".to_string()
}

impl NodeRule {
    /// Rule for a node that only pays out from `payment_field`.
    pub fn payment_only(name: impl Into<String>, payment_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::PaymentOnly,
            advance_field: None,
            payment_field: Some(payment_field.into()),
            strategy: Strategy::PaymentFieldOnly,
            required_status: default_required_status(),
            additional_conditions: Vec::new(),
            description: None,
        }
    }

    /// Rule for a node that detects advance or payment.
    pub fn dual_detection(
        name: impl Into<String>,
        advance_field: impl Into<String>,
        payment_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::DualDetection,
            advance_field: Some(advance_field.into()),
            payment_field: Some(payment_field.into()),
            strategy: Strategy::DetectBothFields,
            required_status: default_required_status(),
            additional_conditions: Vec::new(),
            description: None,
        }
    }

    pub fn with_required_status(mut self, status: impl Into<String>) -> Self {
        self.required_status = status.into();
        self
    }

    pub fn with_condition(
        mut self,
        node_id: impl Into<String>,
        required_status: impl Into<String>,
    ) -> Self {
        self.additional_conditions.push(NodeCondition {
            node_id: node_id.into(),
            required_status: required_status.into(),
            description: None,
        });
        self
    }
}

impl Validate for NodeRule {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.name, "node name")?;
        ConfigValidator::status_name(&self.required_status, "required_status")?;

        if self.advance_field.is_none() && self.payment_field.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "node '{}' has neither advance_field nor payment_field",
                self.name
            )));
        }
        if self.strategy == Strategy::PaymentFieldOnly && self.payment_field.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "node '{}' uses payment_field_only without a payment_field",
                self.name
            )));
        }
        for condition in &self.additional_conditions {
            ConfigValidator::not_empty(&condition.node_id, "condition node_id")?;
            ConfigValidator::status_name(&condition.required_status, "condition required_status")?;
        }
        Ok(())
    }
}

/// Node id → rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    nodes: BTreeMap<String, NodeRule>,
}

impl NodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, replacing any previous rule for the same node.
    pub fn with_node(mut self, node_id: impl Into<String>, rule: NodeRule) -> Self {
        self.nodes.insert(node_id.into(), rule);
        self
    }

    /// Build from a parsed document (`{"nodes": {...}}`).
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: NodeConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON or TOML rule file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let value = ConfigLoader::auto(path)?.load_file(path)?;
        Self::from_value(value)
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeRule> {
        self.nodes.get(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Validate for NodeConfig {
    fn validate(&self) -> Result<()> {
        for (node_id, rule) in &self.nodes {
            ConfigValidator::not_empty(node_id, "node id")?;
            rule.validate()?;
        }
        Ok(())
    }
}
