use serde::{Deserialize, Serialize};

/// One entry of a rule source: a named, untyped rule tree.
///
/// The tree is kept as raw JSON because its node kind is only known from
/// which keys are present; the parser classifies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Rule name, unique within the field it binds to
    pub name: String,

    /// Rule tree: `{field}`, `{value}` or `{operator, operands}` nodes
    pub rule: serde_json::Value,
}

impl RuleDefinition {
    pub fn new(name: impl Into<String>, rule: serde_json::Value) -> Self {
        RuleDefinition {
            name: name.into(),
            rule,
        }
    }
}
