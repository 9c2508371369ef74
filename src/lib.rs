pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod observability;
pub mod rules;
pub mod source;

pub use config::Config;
pub use domain::{Operand, RuleDefinition, ValidationOutcome, Value};
pub use engine::{ErrorPolicy, Evaluator, ExecutionMode};
pub use rules::{OperatorRegistry, RuleParser, RuleRegistry};
