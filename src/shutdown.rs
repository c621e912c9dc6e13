use tokio::signal;

/// Resolves once an operator asks the process to shut down, either via
/// ctrl-c or (on unix) SIGTERM. Passed to axum's `with_graceful_shutdown` so
/// in-flight requests finish -- and their transactions commit or roll back
/// cleanly -- before the listener stops accepting new connections.
pub async fn signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
