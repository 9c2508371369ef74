use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::signal;
use tracing::info;

use ruleval::api::routes::{create_router, AppState};
use ruleval::config::Config;
use ruleval::engine::Evaluator;
use ruleval::observability::{init_tracing, MetricsRegistry};
use ruleval::rules::{RuleParser, RuleRegistry};
use ruleval::source::RuleLoader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize tracing
    init_tracing(&config.log_level, config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting ruleval validation service"
    );

    // Load the startup rule set; the service cannot run without it
    let parser = RuleParser::with_builtins();
    let registry = Arc::new(RuleRegistry::new());
    RuleLoader::new(&config.rules_path).load_into(&parser, &registry)?;

    let evaluator = Evaluator::new(registry)
        .with_error_policy(config.error_policy)
        .with_max_concurrency(config.max_concurrency);

    info!(
        mode = %config.execution_mode,
        error_policy = %config.error_policy,
        max_concurrency = config.max_concurrency,
        "Evaluator configured"
    );

    // Create application state
    let state = Arc::new(AppState {
        evaluator,
        parser,
        execution_mode: config.execution_mode,
        metrics: Arc::new(MetricsRegistry::new()),
        request_timeout: config.request_timeout(),
        start_time: Instant::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    // Create router
    let app = create_router(state);

    // Parse listen address
    let addr: SocketAddr = config.listen_addr.parse()?;

    info!(addr = %addr, "Starting HTTP server");

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    if config.graceful_shutdown {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        axum::serve(listener, app).await?;
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
