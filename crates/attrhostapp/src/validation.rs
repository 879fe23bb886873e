//! # Validation and Save Gating
//!
//! Validation itself is a collaborator: the host only needs a [`Validator`] that turns
//! a node into a [`ValidationOutcome`]. [`RuleValidator`] is a field-rule implementation
//! good enough for headless use; real applications plug in their own.
//!
//! Save gating decides what happens when the user saves while data is unviewed or
//! invalid. Each concern has its own [`SavePolicy`]:
//!
//! | Policy | Behavior |
//! |--------|----------|
//! | `allow` | Save without asking |
//! | `prompt_once` | One confirmation for all offending fields |
//! | `prompt_for_each` | One confirmation per offending field |
//! | `disallow` | Refuse and point at the first offending field |
//!
//! Invalid data is checked before unviewed data.

use crate::model::{AttributeId, AttributeNode, Validity};
use crate::tree::{find_in_display_order, AttributeTree, FindOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub validity: Validity,
    pub message: Option<String>,
    /// Replacement text when the validator normalized case or whitespace.
    pub corrected: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            validity: Validity::Valid,
            message: None,
            corrected: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            validity: Validity::Invalid,
            message: Some(message.into()),
            corrected: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            validity: Validity::Warning,
            message: Some(message.into()),
            corrected: None,
        }
    }

    pub fn with_correction(mut self, corrected: impl Into<String>) -> Self {
        self.corrected = Some(corrected.into());
        self
    }
}

pub trait Validator {
    /// Validates `node`. When `correct` is false the outcome must not carry a correction.
    fn validate(&self, node: &AttributeNode, correct: bool) -> ValidationOutcome;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRule {
    pub required: bool,
    /// Empty values only warn instead of failing.
    pub warn_if_empty: bool,
    pub max_length: Option<usize>,
    /// Closed list of accepted values, compared case-insensitively.
    pub allowed_values: Option<Vec<String>>,
}

/// Per-attribute-name rules. Names without a rule are always valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleValidator {
    pub rules: HashMap<String, FieldRule>,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }
}

impl Validator for RuleValidator {
    fn validate(&self, node: &AttributeNode, correct: bool) -> ValidationOutcome {
        let Some(rule) = self.rules.get(&node.name) else {
            return ValidationOutcome::valid();
        };

        let trimmed = node.text.trim();
        let mut corrected = (correct && trimmed != node.text).then(|| trimmed.to_string());

        if trimmed.is_empty() {
            if rule.required {
                return ValidationOutcome::invalid(format!("{} is required", node.name));
            }
            if rule.warn_if_empty {
                return ValidationOutcome::warning(format!("{} is empty", node.name));
            }
            return ValidationOutcome::valid();
        }

        if let Some(max) = rule.max_length {
            if trimmed.chars().count() > max {
                return ValidationOutcome::invalid(format!(
                    "{} is longer than {} characters",
                    node.name, max
                ));
            }
        }

        if let Some(allowed) = &rule.allowed_values {
            match allowed.iter().find(|v| v.eq_ignore_ascii_case(trimmed)) {
                None => {
                    return ValidationOutcome::invalid(format!(
                        "\"{}\" is not an accepted value for {}",
                        trimmed, node.name
                    ));
                }
                Some(canonical) if correct && canonical != trimmed => {
                    corrected = Some(canonical.clone());
                }
                Some(_) => {}
            }
        }

        match corrected {
            Some(text) => ValidationOutcome::valid().with_correction(text),
            None => ValidationOutcome::valid(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    Allow,
    PromptOnce,
    PromptForEach,
    Disallow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateReason {
    Invalid,
    Unviewed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum SaveVerdict {
    Allowed,
    /// Ask the user; with `per_field` one question per attribute, else a single one.
    Prompt {
        reason: GateReason,
        attributes: Vec<AttributeId>,
        per_field: bool,
    },
    Refused {
        reason: GateReason,
        first: AttributeId,
    },
}

fn offending(tree: &AttributeTree, predicate: impl Fn(&AttributeNode) -> bool) -> Vec<AttributeId> {
    let options = FindOptions {
        stop_at_first: false,
        ..FindOptions::default()
    };
    find_in_display_order(tree, None, options, |n| n.persistable && predicate(n))
        .into_iter()
        .filter_map(|g| g.target())
        .collect()
}

fn apply_policy(policy: SavePolicy, reason: GateReason, attributes: Vec<AttributeId>) -> SaveVerdict {
    match (policy, attributes.first().copied()) {
        (_, None) | (SavePolicy::Allow, _) => SaveVerdict::Allowed,
        (SavePolicy::Disallow, Some(first)) => SaveVerdict::Refused { reason, first },
        (SavePolicy::PromptOnce, Some(_)) => SaveVerdict::Prompt {
            reason,
            attributes,
            per_field: false,
        },
        (SavePolicy::PromptForEach, Some(_)) => SaveVerdict::Prompt {
            reason,
            attributes,
            per_field: true,
        },
    }
}

/// Decides whether `tree` may be saved under the given policies.
pub fn evaluate_save(
    tree: &AttributeTree,
    unviewed_policy: SavePolicy,
    invalid_policy: SavePolicy,
) -> SaveVerdict {
    let invalid = offending(tree, |n| n.validity == Validity::Invalid);
    let verdict = apply_policy(invalid_policy, GateReason::Invalid, invalid);
    if verdict != SaveVerdict::Allowed {
        return verdict;
    }
    let unviewed = offending(tree, |n| !n.viewed);
    apply_policy(unviewed_policy, GateReason::Unviewed, unviewed)
}
