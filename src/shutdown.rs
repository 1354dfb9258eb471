//! Process signal handling
//!
//! SIGINT and SIGTERM cancel the bridge's token. A handler that cannot be
//! installed never fires, so the bridge keeps running instead of exiting 0.

use std::future::Future;
use std::io;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

pub fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        warn!("Shutdown signal received");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            signal_or_pending("Ctrl-C", tokio::signal::ctrl_c()).await;
            return;
        }
    };

    tokio::select! {
        _ = signal_or_pending("Ctrl-C", tokio::signal::ctrl_c()) => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    signal_or_pending("Ctrl-C", tokio::signal::ctrl_c()).await;
}

/// Resolves when `signal` delivers; parks forever if listening failed.
pub async fn signal_or_pending<F>(name: &str, signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}
