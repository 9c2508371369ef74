pub mod operators;
pub mod parser;
pub mod registry;

pub use operators::{BuiltinOperator, OperatorError, OperatorFn, OperatorRegistry, PATTERN_CACHE_CAPACITY};
pub use parser::{CompiledRule, ParseError, RuleParser};
pub use registry::{FieldRules, RegistryError, RuleRegistry};

use thiserror::Error;
use tracing::info;

use crate::domain::RuleDefinition;

/// Failure to add a rule definition to a registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Parse a rule definition and register it.
///
/// Returns the field the rule was bound to. Nothing is registered when
/// parsing fails.
pub fn create_rule(
    parser: &RuleParser,
    registry: &RuleRegistry,
    definition: &RuleDefinition,
) -> Result<String, RuleError> {
    let rule = parser.parse_definition(definition)?;
    let field = rule.field.clone();

    registry.insert(rule)?;

    info!(rule = %definition.name, field = %field, "Rule created");
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_rule() {
        let parser = RuleParser::with_builtins();
        let registry = RuleRegistry::new();

        let def = RuleDefinition::new(
            "username_length",
            json!({
                "operator": "GREATER_THAN",
                "operands": [
                    { "operator": "LENGTH", "operands": [ { "field": "username" } ] },
                    { "value": "6" }
                ]
            }),
        );

        assert_eq!(create_rule(&parser, &registry, &def).unwrap(), "username");
        assert_eq!(registry.len(), 1);

        let err = create_rule(&parser, &registry, &def).unwrap_err();
        assert!(matches!(err, RuleError::Registry(RegistryError::DuplicateRule { .. })));
    }

    #[test]
    fn test_create_rule_parse_failure_leaves_registry_untouched() {
        let parser = RuleParser::with_builtins();
        let registry = RuleRegistry::new();

        let def = RuleDefinition::new(
            "mixed",
            json!({
                "operator": "EQUAL_TO",
                "operands": [ { "field": "a" }, { "field": "b" } ]
            }),
        );

        let err = create_rule(&parser, &registry, &def).unwrap_err();
        assert!(matches!(err, RuleError::Parse(ParseError::MultiField { .. })));
        assert!(registry.is_empty());
    }
}
