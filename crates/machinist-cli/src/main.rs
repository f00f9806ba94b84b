#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use machinist_server::handler::routes;
use machinist_server::middleware::{RouterObservabilityExt, RouterSecurityExt};
use machinist_server::service::{ServiceConfig, ServiceState};

use crate::config::{Cli, MiddlewareConfig};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "machinist_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "machinist_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "machinist_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    cli.init_tracing();

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting machinist server"
    );

    cli.log();
    cli.validate()?;

    let state = create_service_state(&cli.service).await?;
    let router = create_router(state, &cli.middleware);

    server::serve(router, cli.server)
        .await
        .context("server terminated with error")?;

    Ok(())
}

/// Creates the service state from configuration.
async fn create_service_state(config: &ServiceConfig) -> anyhow::Result<ServiceState> {
    ServiceState::from_config(config)
        .await
        .context("failed to create service state")
}

/// Creates the router with all middleware layers applied.
///
/// Recovery is applied per route group inside [`routes`] so log streams can
/// skip the request timeout. Layers below wrap outermost last:
/// 1. Observability - request IDs and tracing spans
/// 2. Security - CORS, security headers, compression, body limit
fn create_router(state: ServiceState, middleware: &MiddlewareConfig) -> Router {
    routes(&middleware.recovery)
        .with_state(state)
        .with_security(&middleware.cors)
        .with_observability()
}
