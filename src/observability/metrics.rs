use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::domain::ValidationOutcome;

/// Metrics registry for the application.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Total validation requests processed
    pub validations_total: AtomicU64,

    /// Validation requests by result
    pub validations_success: AtomicU64,
    pub validations_failure: AtomicU64,
    pub validations_error: AtomicU64,

    /// Validation latency buckets (microseconds)
    pub latency_under_1ms: AtomicU64,
    pub latency_1_5ms: AtomicU64,
    pub latency_5_10ms: AtomicU64,
    pub latency_10_50ms: AtomicU64,
    pub latency_50_100ms: AtomicU64,
    pub latency_over_100ms: AtomicU64,

    /// Rule evaluation counts
    pub rules_evaluated_total: AtomicU64,
    pub rules_violated_total: AtomicU64,
    pub rule_errors_total: AtomicU64,

    /// Admin rule creation
    pub rules_created_total: AtomicU64,
    pub rule_create_errors: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        MetricsRegistry::default()
    }

    /// Record a completed validation.
    pub fn record_outcome(&self, outcome: &ValidationOutcome) {
        self.validations_total.fetch_add(1, Ordering::Relaxed);

        if outcome.passed {
            self.validations_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.validations_failure.fetch_add(1, Ordering::Relaxed);
        }

        self.rules_evaluated_total
            .fetch_add(outcome.evaluated as u64, Ordering::Relaxed);
        self.rules_violated_total
            .fetch_add(outcome.violated_rules.len() as u64, Ordering::Relaxed);
        self.rule_errors_total
            .fetch_add(outcome.errored as u64, Ordering::Relaxed);
    }

    /// Record a validation that could not be performed.
    pub fn record_error(&self) {
        self.validations_total.fetch_add(1, Ordering::Relaxed);
        self.validations_error.fetch_add(1, Ordering::Relaxed);
    }

    /// Record validation latency.
    pub fn record_latency(&self, start: Instant) {
        let micros = start.elapsed().as_micros() as u64;

        if micros < 1000 {
            self.latency_under_1ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 5000 {
            self.latency_1_5ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 10000 {
            self.latency_5_10ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 50000 {
            self.latency_10_50ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 100000 {
            self.latency_50_100ms.fetch_add(1, Ordering::Relaxed);
        } else {
            self.latency_over_100ms.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an admin rule creation attempt.
    pub fn record_rule_created(&self, success: bool) {
        if success {
            self.rules_created_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rule_create_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        format!(
            r#"# HELP ruleval_validations_total Total number of validation requests
# TYPE ruleval_validations_total counter
ruleval_validations_total {}

# HELP ruleval_validations Validation requests by result
# TYPE ruleval_validations counter
ruleval_validations{{result="success"}} {}
ruleval_validations{{result="failure"}} {}
ruleval_validations{{result="error"}} {}

# HELP ruleval_validation_latency_bucket Validation latency histogram
# TYPE ruleval_validation_latency_bucket counter
ruleval_validation_latency_bucket{{le="0.001"}} {}
ruleval_validation_latency_bucket{{le="0.005"}} {}
ruleval_validation_latency_bucket{{le="0.01"}} {}
ruleval_validation_latency_bucket{{le="0.05"}} {}
ruleval_validation_latency_bucket{{le="0.1"}} {}
ruleval_validation_latency_bucket{{le="+Inf"}} {}

# HELP ruleval_rules_evaluated_total Total rule evaluations
# TYPE ruleval_rules_evaluated_total counter
ruleval_rules_evaluated_total {}

# HELP ruleval_rules_violated_total Total rule violations
# TYPE ruleval_rules_violated_total counter
ruleval_rules_violated_total {}

# HELP ruleval_rule_errors_total Rule evaluations that failed
# TYPE ruleval_rule_errors_total counter
ruleval_rule_errors_total {}

# HELP ruleval_rules_created_total Rules created at runtime
# TYPE ruleval_rules_created_total counter
ruleval_rules_created_total {}

# HELP ruleval_rule_create_errors_total Rejected rule creations
# TYPE ruleval_rule_create_errors_total counter
ruleval_rule_create_errors_total {}
"#,
            self.validations_total.load(Ordering::Relaxed),
            self.validations_success.load(Ordering::Relaxed),
            self.validations_failure.load(Ordering::Relaxed),
            self.validations_error.load(Ordering::Relaxed),
            self.latency_under_1ms.load(Ordering::Relaxed),
            self.latency_1_5ms.load(Ordering::Relaxed),
            self.latency_5_10ms.load(Ordering::Relaxed),
            self.latency_10_50ms.load(Ordering::Relaxed),
            self.latency_50_100ms.load(Ordering::Relaxed),
            self.latency_over_100ms.load(Ordering::Relaxed),
            self.rules_evaluated_total.load(Ordering::Relaxed),
            self.rules_violated_total.load(Ordering::Relaxed),
            self.rule_errors_total.load(Ordering::Relaxed),
            self.rules_created_total.load(Ordering::Relaxed),
            self.rule_create_errors.load(Ordering::Relaxed),
        )
    }
}

/// Guard for timing operations.
pub struct TimingGuard<'a> {
    registry: &'a MetricsRegistry,
    start: Instant,
}

impl<'a> TimingGuard<'a> {
    pub fn new(registry: &'a MetricsRegistry) -> Self {
        TimingGuard {
            registry,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for TimingGuard<'a> {
    fn drop(&mut self) {
        self.registry.record_latency(self.start);
    }
}
