use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{EvaluationContext, Operand};

use super::parser::CompiledRule;

/// Errors returned by registry mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("rule {rule:?} already exists for field {field:?}")]
    DuplicateRule { field: String, rule: String },

    #[error("{0} is not supported")]
    NotSupported(&'static str),
}

/// Rules registered under one field, keyed by rule name.
pub type FieldRules = BTreeMap<String, Arc<Operand>>;

/// Concurrent index of field name → rule name → rule tree.
///
/// Lookups share a read lock; registration takes the write lock for the
/// duplicate check and insert together.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    fields: RwLock<HashMap<String, FieldRules>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        RuleRegistry::default()
    }

    /// Register a rule tree under `field`.
    pub fn register(
        &self,
        field: &str,
        rule_name: &str,
        root: Arc<Operand>,
    ) -> Result<(), RegistryError> {
        let mut fields = self.fields.write();
        let rules = fields.entry(field.to_string()).or_default();

        if rules.contains_key(rule_name) {
            return Err(RegistryError::DuplicateRule {
                field: field.to_string(),
                rule: rule_name.to_string(),
            });
        }

        rules.insert(rule_name.to_string(), root);
        debug!(field = field, rule = rule_name, "Rule registered");
        Ok(())
    }

    /// Register a parsed rule under the field it references.
    pub fn insert(&self, rule: CompiledRule) -> Result<(), RegistryError> {
        self.register(&rule.field, &rule.name, rule.root)
    }

    /// Snapshot of the rules registered under `field`; empty if none.
    pub fn lookup(&self, field: &str) -> FieldRules {
        self.fields.read().get(field).cloned().unwrap_or_default()
    }

    /// Rule removal is not available; always returns `NotSupported`.
    pub fn remove(&self, rule_name: &str) -> Result<(), RegistryError> {
        info!(rule = rule_name, "Rejected rule removal request");
        Err(RegistryError::NotSupported("rule removal"))
    }

    /// Build one evaluation context per rule matching a projected field.
    ///
    /// Fields are visited in iteration order of `fields`, rules in name
    /// order. The whole join runs under a single read lock.
    pub fn bind<'a, I>(&self, fields: I) -> Vec<EvaluationContext>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let registered = self.fields.read();
        let mut contexts = Vec::new();

        for (field, value) in fields {
            if let Some(rules) = registered.get(field.as_str()) {
                for (name, root) in rules {
                    contexts.push(
                        EvaluationContext::new(name, value.as_str(), root.clone())
                            .with_field(field.as_str()),
                    );
                }
            }
        }

        contexts
    }

    /// Total number of registered rules.
    pub fn len(&self) -> usize {
        self.fields.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fields with at least one rule.
    pub fn field_count(&self) -> usize {
        self.fields.read().values().filter(|r| !r.is_empty()).count()
    }
}
