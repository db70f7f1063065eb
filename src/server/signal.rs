// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)
//
// Non-Unix platforms only get Ctrl+C.

use crate::logger;
use tokio::sync::watch;

/// Receivers observe `true` once shutdown has been requested
pub type ShutdownReceiver = watch::Receiver<bool>;

pub fn shutdown_channel() -> (watch::Sender<bool>, ShutdownReceiver) {
    watch::channel(false)
}

/// Register the shutdown signals and flip `shutdown` when one arrives
///
/// Must be called from inside the runtime. Registration errors are returned
/// rather than swallowed so startup fails loudly.
#[cfg(unix)]
pub fn spawn_signal_listener(shutdown: watch::Sender<bool>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        logger::log_shutdown_requested(name);
        let _ = shutdown.send(true);
    });
    Ok(())
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn spawn_signal_listener(shutdown: watch::Sender<bool>) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            logger::log_shutdown_requested("Ctrl+C");
            let _ = shutdown.send(true);
        }
    });
    Ok(())
}
