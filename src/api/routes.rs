use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::engine::{Evaluator, ExecutionMode};
use crate::observability::{MetricsRegistry, TimingGuard};
use crate::rules::{create_rule, RegistryError, RuleError, RuleParser};

use super::request::{decode_document, decode_rule};
use super::response::{HealthResponse, ReadyResponse, ResultResponse};

/// Shared application state.
pub struct AppState {
    /// Rule evaluator, holding the shared rule registry
    pub evaluator: Evaluator,

    /// Parser used for runtime rule creation
    pub parser: RuleParser,

    /// Execution strategy for validation requests
    pub execution_mode: ExecutionMode,

    /// Request counters and latency buckets
    pub metrics: Arc<MetricsRegistry>,

    /// Caller-level timeout applied to every request
    pub request_timeout: Duration,

    /// Application start time
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let request_timeout = state.request_timeout;

    Router::new()
        .route("/api/validation", post(handle_validation))
        .route("/admin/rule", post(handle_create_rule))
        .route("/admin/rule/:rule_name", delete(handle_delete_rule))
        .route("/health", get(handle_health))
        .route("/ready", get(handle_ready))
        .route("/metrics", get(handle_metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle document validation requests.
async fn handle_validation(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let _timer = TimingGuard::new(&state.metrics);

    let document = match decode_document(&body) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "Invalid validation request body");
            state.metrics.record_error();
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ResultResponse::error(e.to_string())),
            );
        }
    };

    match state.evaluator.validate(&document, state.execution_mode).await {
        Ok(outcome) => {
            state.metrics.record_outcome(&outcome);
            info!(
                passed = outcome.passed,
                rules = outcome.evaluated,
                violated = outcome.violated_rules.len(),
                errored = outcome.errored,
                "Validation completed"
            );

            let status = if outcome.passed {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            (status, Json(ResultResponse::from(outcome)))
        }
        Err(e) => {
            warn!(error = %e, "Validation aborted");
            state.metrics.record_error();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ResultResponse::error(e.to_string())),
            )
        }
    }
}

/// Handle runtime rule creation.
async fn handle_create_rule(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let definition = match decode_rule(&body) {
        Ok(def) => def,
        Err(e) => {
            warn!(error = %e, "Invalid rule definition body");
            state.metrics.record_rule_created(false);
            return (
                StatusCode::BAD_REQUEST,
                Json(ResultResponse::error(e.to_string())),
            );
        }
    };

    match create_rule(&state.parser, state.evaluator.registry(), &definition) {
        Ok(_) => {
            state.metrics.record_rule_created(true);
            (StatusCode::OK, Json(ResultResponse::Success))
        }
        Err(e) => {
            warn!(rule = %definition.name, error = %e, "Rule creation rejected");
            state.metrics.record_rule_created(false);
            (rule_error_status(&e), Json(ResultResponse::error(e.to_string())))
        }
    }
}

/// Rule deletion is not available.
async fn handle_delete_rule(
    State(state): State<Arc<AppState>>,
    Path(rule_name): Path<String>,
) -> impl IntoResponse {
    let err = match state.evaluator.registry().remove(&rule_name) {
        Ok(()) => return (StatusCode::OK, Json(ResultResponse::Success)),
        Err(e) => RuleError::from(e),
    };

    (rule_error_status(&err), Json(ResultResponse::error(err.to_string())))
}

fn rule_error_status(err: &RuleError) -> StatusCode {
    match err {
        RuleError::Parse(_) => StatusCode::BAD_REQUEST,
        RuleError::Registry(RegistryError::DuplicateRule { .. }) => StatusCode::CONFLICT,
        RuleError::Registry(RegistryError::NotSupported(_)) => StatusCode::NOT_IMPLEMENTED,
    }
}

/// Health check endpoint.
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Readiness check endpoint.
async fn handle_ready(State(state): State<Arc<AppState>>) -> axum::response::Response {
    let registry = state.evaluator.registry();

    if registry.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ResultResponse::error("no rules loaded")),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            ready: true,
            rules: registry.len(),
            fields: registry.field_count(),
            execution_mode: state.execution_mode.to_string(),
        }),
    )
        .into_response()
}

/// Metrics endpoint (Prometheus format).
async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.evaluator.registry();

    let metrics = format!(
        r#"# HELP ruleval_uptime_seconds Application uptime in seconds
# TYPE ruleval_uptime_seconds counter
ruleval_uptime_seconds {}

# HELP ruleval_rules Number of registered rules
# TYPE ruleval_rules gauge
ruleval_rules {}

# HELP ruleval_rule_fields Number of fields with registered rules
# TYPE ruleval_rule_fields gauge
ruleval_rule_fields {}

{}"#,
        state.start_time.elapsed().as_secs(),
        registry.len(),
        registry.field_count(),
        state.metrics.to_prometheus(),
    );

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )],
        metrics,
    )
}
