// Server loop module
// Accepts connections until shutdown is requested, then waits for open
// connections to finish

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::handle_connection;
use super::signal::ShutdownReceiver;
use super::ServerState;
use crate::logger;

/// Upper bound on waiting for open connections after shutdown
const DRAIN_LIMIT: Duration = Duration::from_secs(30);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Serve `listener` until `shutdown` flips
pub async fn run(listener: TcpListener, state: Arc<ServerState>, mut shutdown: ShutdownReceiver) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => handle_connection(
                        stream,
                        peer_addr,
                        Arc::clone(&state),
                        Arc::clone(&active_connections),
                        shutdown.clone(),
                    ),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    drop(listener);
    drain(&active_connections).await;
}

/// Wait for open connections to close, up to `DRAIN_LIMIT`
async fn drain(active_connections: &AtomicUsize) {
    let open = active_connections.load(Ordering::SeqCst);
    if open == 0 {
        return;
    }
    logger::log_info(&format!("Waiting for {open} open connection(s) to finish"));

    let deadline = tokio::time::Instant::now() + DRAIN_LIMIT;
    while active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutting down with {} connection(s) still open",
                active_connections.load(Ordering::SeqCst)
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
