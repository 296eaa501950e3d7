//! Field validator collaborator used by the default handler.

use entify_model::{Result, SharedTranslator, Value, passthrough};
use tracing::debug;

use crate::rule::{FieldRule, parse_rules};

/// Accumulates `(field, value, rules, label)` registrations and checks them
/// in one pass.
pub trait Validator {
    /// Register a field. Malformed rule strings are rejected here.
    fn set_full_rule(&mut self, field: &str, value: &Value, rules: &str, label: &str)
    -> Result<()>;

    /// Run every registered rule. Returns `true` when no rule failed.
    fn validate(&mut self) -> bool;

    /// Messages from the last [`Validator::validate`] call.
    fn messages(&self) -> &[String];

    /// Drop registrations and messages.
    fn reset(&mut self);
}

#[derive(Debug)]
struct Registration {
    field: String,
    label: String,
    value: Value,
    rules: Vec<FieldRule>,
}

/// Rule-string validator. Stops at the first failing rule of each field.
pub struct StandardValidator {
    translator: SharedTranslator,
    pending: Vec<Registration>,
    messages: Vec<String>,
}

impl StandardValidator {
    pub fn new(translator: SharedTranslator) -> Self {
        Self {
            translator,
            pending: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn message(&self, rule: &FieldRule, label: &str) -> String {
        self.translator
            .translate(rule.message_template())
            .replace("{label}", label)
            .replace("{arg}", &rule.argument())
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new(passthrough())
    }
}

impl Validator for StandardValidator {
    fn set_full_rule(
        &mut self,
        field: &str,
        value: &Value,
        rules: &str,
        label: &str,
    ) -> Result<()> {
        let rules = parse_rules(field, rules)?;
        if rules.is_empty() {
            return Ok(());
        }
        self.pending.push(Registration {
            field: field.to_string(),
            label: label.to_string(),
            value: value.clone(),
            rules,
        });
        Ok(())
    }

    fn validate(&mut self) -> bool {
        let mut messages = Vec::new();
        for registration in &self.pending {
            if let Some(rule) = registration
                .rules
                .iter()
                .find(|rule| !rule.passes(&registration.value))
            {
                debug!(field = %registration.field, rule = rule.name(), "validation failed");
                messages.push(self.message(rule, &registration.label));
            }
        }
        self.messages = messages;
        self.messages.is_empty()
    }

    fn messages(&self) -> &[String] {
        &self.messages
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.messages.clear();
    }
}
