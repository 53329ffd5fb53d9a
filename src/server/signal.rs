// Signal handling module
//
// SIGTERM and SIGINT stop the accept loop; in-flight connections finish
// in their own tasks.

use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Spawn a task that notifies `shutdown` on SIGTERM or SIGINT
///
/// # Errors
///
/// Fails when the signal handlers cannot be registered.
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        logger::log_shutdown(name);
        shutdown.notify_one();
    });
    Ok(())
}

/// Non-Unix fallback: only Ctrl+C is handled
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Notify>) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            logger::log_shutdown("Ctrl+C");
            shutdown.notify_one();
        }
    });
    Ok(())
}
