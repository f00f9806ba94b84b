//! HTTP server startup with bounded graceful shutdown.

use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::lifecycle::serve_with_shutdown;
use super::shutdown::shutdown_signal;
use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Binds to the configured address and serves `app` until a shutdown signal.
///
/// After the signal, open connections get `shutdown_timeout` to finish.
/// Log streams follow a deploy process and may never end on their own, so
/// the server stops waiting once the timeout elapses.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_http(app: Router, server_config: ServerConfig) -> io::Result<()> {
    let server_addr = server_config.server_addr();

    let listener = TcpListener::bind(server_addr).await.inspect_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            error = %err,
            "Failed to bind to address"
        );
    })?;

    let token = CancellationToken::new();
    let shutdown_timeout = server_config.shutdown_timeout();

    serve_with_shutdown(&server_config, || async move {
        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(token.clone()));

        tokio::select! {
            result = server.into_future() => result,
            () = shutdown_deadline(token, shutdown_timeout) => Ok(()),
        }
    })
    .await
}

/// Resolves `timeout` after `token` is cancelled.
async fn shutdown_deadline(token: CancellationToken, timeout: Duration) {
    token.cancelled().await;
    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        timeout_secs = timeout.as_secs(),
        "Graceful shutdown initiated"
    );

    tokio::time::sleep(timeout).await;
    tracing::warn!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        timeout_secs = timeout.as_secs(),
        "Graceful shutdown timed out, closing remaining connections"
    );
}
