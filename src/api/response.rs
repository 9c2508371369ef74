use serde::Serialize;

use crate::domain::ValidationOutcome;

/// Response body of the validation and rule admin endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ResultResponse {
    /// Document passed every rule, or the admin operation succeeded
    Success,

    /// Document violated at least one rule
    Failure { rules: Vec<String> },

    /// Request could not be processed
    Error {
        #[serde(rename = "error-message")]
        error_message: String,
    },
}

impl ResultResponse {
    pub fn error(message: impl Into<String>) -> Self {
        ResultResponse::Error {
            error_message: message.into(),
        }
    }
}

impl From<ValidationOutcome> for ResultResponse {
    fn from(outcome: ValidationOutcome) -> Self {
        if outcome.passed {
            ResultResponse::Success
        } else {
            ResultResponse::Failure {
                rules: outcome.violated_rules,
            }
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub rules: usize,
    pub fields: usize,
    pub execution_mode: String,
}
