use serde_json::{Map, Value as Json};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{Operand, RuleDefinition};

use super::operators::OperatorRegistry;

const FIELD_KEY: &str = "field";
const VALUE_KEY: &str = "value";
const OPERATOR_KEY: &str = "operator";
const OPERANDS_KEY: &str = "operands";

/// Errors produced while turning a rule definition into an operand tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("malformed rule node at {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("unknown operator {name:?} at {path}")]
    UnknownOperator { name: String, path: String },

    #[error("rule must reference exactly one field, found {}", describe_fields(.fields))]
    MultiField { fields: Vec<String> },
}

fn describe_fields(fields: &[String]) -> String {
    if fields.is_empty() {
        "none".to_string()
    } else {
        fields.join(", ")
    }
}

impl ParseError {
    fn decode(path: &str, reason: impl Into<String>) -> Self {
        ParseError::Decode {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed rule, bound to the single field it references.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub field: String,
    pub root: Arc<Operand>,
}

/// Recursive-descent parser from untagged rule trees to [`Operand`]s.
///
/// Node kind is decided by key presence, checked in the order
/// `field`, `value`, `operator`.
#[derive(Debug, Clone)]
pub struct RuleParser {
    operators: Arc<OperatorRegistry>,
}

impl RuleParser {
    pub fn new(operators: Arc<OperatorRegistry>) -> Self {
        RuleParser { operators }
    }

    /// Parser over the built-in operator set.
    pub fn with_builtins() -> Self {
        RuleParser::new(Arc::new(OperatorRegistry::with_builtins()))
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    /// Parse a named rule definition.
    pub fn parse_definition(&self, definition: &RuleDefinition) -> Result<CompiledRule, ParseError> {
        if definition.name.trim().is_empty() {
            return Err(ParseError::decode("name", "rule name cannot be empty"));
        }

        let (root, field) = self.parse(&definition.rule)?;

        Ok(CompiledRule {
            name: definition.name.clone(),
            field,
            root: Arc::new(root),
        })
    }

    /// Parse a rule tree, returning it with the one field it references.
    pub fn parse(&self, node: &Json) -> Result<(Operand, String), ParseError> {
        let mut fields = BTreeSet::new();
        let root = self.parse_node(node, "rule", &mut fields)?;

        if fields.len() != 1 {
            return Err(ParseError::MultiField {
                fields: fields.into_iter().collect(),
            });
        }

        let field = fields.into_iter().next().unwrap_or_default();
        Ok((root, field))
    }

    fn parse_node(
        &self,
        node: &Json,
        path: &str,
        fields: &mut BTreeSet<String>,
    ) -> Result<Operand, ParseError> {
        let object = node
            .as_object()
            .ok_or_else(|| ParseError::decode(path, format!("expected object, got {}", json_kind(node))))?;

        if let Some(name) = object.get(FIELD_KEY) {
            let name = expect_string(name, path, FIELD_KEY)?;
            fields.insert(name.to_string());
            return Ok(Operand::field(name));
        }

        if let Some(value) = object.get(VALUE_KEY) {
            let value = expect_string(value, path, VALUE_KEY)?;
            return Ok(Operand::value(value));
        }

        if let Some(operator) = object.get(OPERATOR_KEY) {
            return self.parse_term(object, operator, path, fields);
        }

        Err(ParseError::decode(
            path,
            "expected one of \"field\", \"value\" or \"operator\"",
        ))
    }

    fn parse_term(
        &self,
        object: &Map<String, Json>,
        operator: &Json,
        path: &str,
        fields: &mut BTreeSet<String>,
    ) -> Result<Operand, ParseError> {
        let name = expect_string(operator, path, OPERATOR_KEY)?;

        let children: &[Json] = match object.get(OPERANDS_KEY) {
            None => &[],
            Some(Json::Array(items)) => items,
            Some(other) => {
                return Err(ParseError::decode(
                    path,
                    format!("\"operands\" must be an array, got {}", json_kind(other)),
                ))
            }
        };

        if !self.operators.contains(name) {
            return Err(ParseError::UnknownOperator {
                name: name.to_string(),
                path: path.to_string(),
            });
        }

        let operands = children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                let child_path = format!("{}.operands[{}]", path, i);
                self.parse_node(child, &child_path, fields)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let first_literal = match operands.first() {
            Some(Operand::Value(literal)) => Some(literal.value.as_str()),
            _ => None,
        };
        let function = self
            .operators
            .resolve_for(name, first_literal)
            .ok_or_else(|| ParseError::UnknownOperator {
                name: name.to_string(),
                path: path.to_string(),
            })?;

        Ok(Operand::term(name, function, operands))
    }
}

impl Default for RuleParser {
    fn default() -> Self {
        RuleParser::with_builtins()
    }
}

fn expect_string<'a>(value: &'a Json, path: &str, key: &str) -> Result<&'a str, ParseError> {
    value.as_str().ok_or_else(|| {
        ParseError::decode(
            path,
            format!("\"{}\" must be a string, got {}", key, json_kind(value)),
        )
    })
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
