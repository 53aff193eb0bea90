//! # Rule Outcomes
//!
//! The per-rule result returned by a jurisdiction rule engine for one
//! credential at one evaluation instant.

use serde::{Deserialize, Serialize};

/// Result of evaluating a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleResult {
    /// The rule is satisfied.
    Pass,
    /// The rule is violated.
    Fail,
}

/// Outcome of one jurisdiction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Rule identifier as published in the rule set (e.g. `VR-CH-0001`).
    pub rule_id: String,
    /// Pass or fail.
    pub result: RuleResult,
    /// Human-readable rule description, if the rule set provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RuleOutcome {
    /// A passing outcome for `rule_id`.
    pub fn pass(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            result: RuleResult::Pass,
            description: None,
        }
    }

    /// A failing outcome for `rule_id`.
    pub fn fail(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            result: RuleResult::Fail,
            description: None,
        }
    }

    /// Whether the rule failed.
    pub fn is_fail(&self) -> bool {
        self.result == RuleResult::Fail
    }
}
