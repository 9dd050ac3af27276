//! Ctrl-C / SIGTERM handling: fire the run's cancellation token.

use tokio::task::JoinHandle;
use urlmon_core::control::CancelToken;

/// Spawn a task that cancels `cancel` on the first interrupt. Abort the handle once the run is over.
pub fn spawn_interrupt_watcher(cancel: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_interrupt().await;
        tracing::warn!("interrupt received, cancelling in-flight checks");
        cancel.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("cannot listen for SIGTERM: {}", e);
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() {
    ctrl_c().await;
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
