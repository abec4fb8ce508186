//! Ctrl-C handling
//!
//! The listener only cancels a token. The drain loop observes it, and the
//! caller finalizes the session and renders the partial report.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns a task that cancels `cancel` on the first Ctrl-C
///
/// The task also exits quietly when the token is cancelled by someone else.
pub fn spawn_interrupt_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::warn!("Interrupt received, flushing partial report");
                    cancel.cancel();
                }
                Err(e) => tracing::error!("Unable to listen for Ctrl-C: {}", e),
            },
            _ = cancel.cancelled() => {}
        }
    })
}
