use serde_json::Value as Json;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::domain::{EvaluationContext, RuleVerdict, ValidationOutcome};
use crate::rules::RuleRegistry;

use super::projector::{project, ProjectedFields, ProjectionError};
use super::{ErrorPolicy, ExecutionMode};

/// Default cap on in-flight rule evaluations per request.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

/// Applies registered rules to projected documents.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<RuleRegistry>,
    error_policy: ErrorPolicy,
    max_concurrency: usize,
}

impl Evaluator {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Evaluator {
            registry,
            error_policy: ErrorPolicy::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Cap concurrent evaluations for the fan-out strategy (minimum 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Project a document and evaluate it.
    ///
    /// Projection errors abort the whole validation; per-rule evaluation
    /// errors never do.
    pub async fn validate(
        &self,
        document: &Json,
        mode: ExecutionMode,
    ) -> Result<ValidationOutcome, ProjectionError> {
        let fields = project(document)?;
        Ok(self.evaluate(&fields, mode).await)
    }

    pub async fn evaluate(&self, fields: &ProjectedFields, mode: ExecutionMode) -> ValidationOutcome {
        match mode {
            ExecutionMode::Sequential => self.evaluate_sequential(fields),
            ExecutionMode::Concurrent => self.evaluate_concurrent(fields).await,
        }
    }

    /// Evaluate matched rules one after another in discovery order.
    pub fn evaluate_sequential(&self, fields: &ProjectedFields) -> ValidationOutcome {
        let errored_as_violation = self.error_policy.counts_as_violation();
        let contexts = self.registry.bind(fields);

        let mut outcome = ValidationOutcome::new();
        for ctx in &contexts {
            outcome.record(&ctx.rule_name, judge(ctx), errored_as_violation);
        }

        debug!(
            rules = outcome.evaluated,
            passed = outcome.passed,
            "Sequential evaluation finished"
        );
        outcome
    }

    /// Evaluate matched rules as independent tasks and reduce the results.
    ///
    /// One task is spawned per matched rule, and a task is only spawned
    /// once it holds a permit, so at most `max_concurrency` exist at a
    /// time. Returns once every task has finished.
    pub async fn evaluate_concurrent(&self, fields: &ProjectedFields) -> ValidationOutcome {
        let errored_as_violation = self.error_policy.counts_as_violation();
        let contexts = self.registry.bind(fields);

        if contexts.is_empty() {
            return ValidationOutcome::new();
        }

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for ctx in contexts {
            // The semaphore is never closed, so a permit is always granted
            let permit = permits.clone().acquire_owned().await.ok();
            tasks.spawn(async move {
                let _permit = permit;
                ValidationOutcome::from_verdict(&ctx.rule_name, judge(&ctx), errored_as_violation)
            });
        }

        let mut outcome = ValidationOutcome::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(partial) => outcome = outcome.merge(partial),
                // Panics are caught in `judge`; only cancellation lands here
                Err(e) => {
                    error!(error = %e, "Rule evaluation task failed");
                    outcome.evaluated += 1;
                    outcome.errored += 1;
                    if errored_as_violation {
                        outcome.passed = false;
                    }
                }
            }
        }

        debug!(
            rules = outcome.evaluated,
            passed = outcome.passed,
            "Concurrent evaluation finished"
        );
        outcome
    }
}

/// Evaluate one context, logging evaluation failures.
///
/// A panicking operator is contained here and reported as an errored rule,
/// so both strategies attribute it to the same rule name.
fn judge(ctx: &EvaluationContext) -> RuleVerdict {
    match panic::catch_unwind(AssertUnwindSafe(|| ctx.run())) {
        Ok(Ok(true)) => RuleVerdict::Passed,
        Ok(Ok(false)) => RuleVerdict::Violated,
        Ok(Err(e)) => {
            warn!(
                rule = %ctx.rule_name,
                field = %ctx.field,
                error = %e,
                "Rule evaluation failed"
            );
            RuleVerdict::Errored
        }
        Err(_) => {
            error!(
                rule = %ctx.rule_name,
                field = %ctx.field,
                "Rule evaluation panicked"
            );
            RuleVerdict::Errored
        }
    }
}
