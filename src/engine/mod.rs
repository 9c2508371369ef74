pub mod evaluator;
pub mod projector;

pub use evaluator::{Evaluator, DEFAULT_MAX_CONCURRENCY};
pub use projector::{project, ProjectedFields, ProjectionError};

use clap::ValueEnum;
use std::fmt;

/// How the rules matched by one document are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExecutionMode {
    /// One rule after another on the request task
    Sequential,
    /// One task per rule, reduced once all complete
    #[default]
    Concurrent,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Treatment of rules whose evaluation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ErrorPolicy {
    /// Count the rule as neither passed nor violated
    #[default]
    Ignore,
    /// Count the rule as violated
    Fail,
}

impl ErrorPolicy {
    #[inline]
    pub fn counts_as_violation(&self) -> bool {
        *self == ErrorPolicy::Fail
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Ignore => write!(f, "ignore"),
            ErrorPolicy::Fail => write!(f, "fail"),
        }
    }
}
