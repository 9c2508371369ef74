pub mod definition;
pub mod operand;
pub mod outcome;
pub mod value;

pub use definition::RuleDefinition;
pub use operand::{EvalError, EvaluationContext, FieldOperand, Operand, TermOperand, ValueOperand};
pub use outcome::{RuleVerdict, ValidationOutcome};
pub use value::Value;
