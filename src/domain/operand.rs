use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::rules::operators::{OperatorError, OperatorFn};

use super::Value;

/// Errors raised while evaluating a rule tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("operator {operator} failed: {source}")]
    Operator {
        operator: String,
        #[source]
        source: OperatorError,
    },

    #[error("rule produced {0} instead of a boolean")]
    NotBoolean(&'static str),
}

/// Per-evaluation binding of a field's run-time value.
///
/// One context is built for every (rule, request) pair and dropped once
/// the rule has been evaluated.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub rule_name: String,
    /// Path of the projected field; empty when built outside a registry join
    pub field: String,
    pub field_value: String,
    pub rule: Arc<Operand>,
}

impl EvaluationContext {
    pub fn new(rule_name: impl Into<String>, field_value: impl Into<String>, rule: Arc<Operand>) -> Self {
        EvaluationContext {
            rule_name: rule_name.into(),
            field: String::new(),
            field_value: field_value.into(),
            rule,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Evaluate the bound rule and require a boolean verdict.
    pub fn run(&self) -> Result<bool, EvalError> {
        let value = self.rule.evaluate(self)?;
        value
            .as_bool()
            .ok_or_else(|| EvalError::NotBoolean(value.type_name()))
    }
}

/// Node of a rule's expression tree.
#[derive(Debug, Clone)]
pub enum Operand {
    Field(FieldOperand),
    Value(ValueOperand),
    Term(TermOperand),
}

impl Operand {
    pub fn field(name: impl Into<String>) -> Self {
        Operand::Field(FieldOperand { name: name.into() })
    }

    pub fn value(value: impl Into<String>) -> Self {
        Operand::Value(ValueOperand {
            value: value.into(),
        })
    }

    pub fn term(operator: impl Into<String>, function: OperatorFn, operands: Vec<Operand>) -> Self {
        Operand::Term(TermOperand {
            operator: operator.into(),
            function,
            operands,
        })
    }

    /// Evaluate this node against the given context.
    pub fn evaluate(&self, context: &EvaluationContext) -> Result<Value, EvalError> {
        match self {
            Operand::Field(_) => Ok(Value::Str(context.field_value.clone())),
            Operand::Value(v) => Ok(Value::Str(v.value.clone())),
            Operand::Term(t) => t.evaluate(context),
        }
    }

    /// Child operands; empty for leaves.
    pub fn operands(&self) -> &[Operand] {
        match self {
            Operand::Term(t) => &t.operands,
            _ => &[],
        }
    }
}

/// Reference to the field the rule is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOperand {
    pub name: String,
}

/// String literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueOperand {
    pub value: String,
}

/// Operator applied to an ordered list of child operands.
#[derive(Clone)]
pub struct TermOperand {
    pub operator: String,
    function: OperatorFn,
    pub operands: Vec<Operand>,
}

impl TermOperand {
    fn evaluate(&self, context: &EvaluationContext) -> Result<Value, EvalError> {
        // An operator is never invoked without operands
        if self.operands.is_empty() {
            return Ok(Value::Null);
        }

        let args = self
            .operands
            .iter()
            .map(|operand| operand.evaluate(context))
            .collect::<Result<Vec<_>, _>>()?;

        (self.function)(&args).map_err(|source| EvalError::Operator {
            operator: self.operator.clone(),
            source,
        })
    }
}

impl fmt::Debug for TermOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermOperand")
            .field("operator", &self.operator)
            .field("operands", &self.operands)
            .finish()
    }
}
