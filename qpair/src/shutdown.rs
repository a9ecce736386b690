//! Cooperative shutdown.
//!
//! A [`ShutdownTrigger`] flips a `watch` flag; loops hold a [`Shutdown`] and
//! only look at it between units of work, so an in-flight publish or a
//! delivery being processed always completes first.

use std::future::Future;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Create a connected trigger/listener pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half observed by the loops.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested.
    ///
    /// If every trigger is dropped without firing, this never resolves.
    pub async fn triggered(&mut self) {
        if self.rx.wait_for(|requested| *requested).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Wait for SIGINT or SIGTERM and return its name.
async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Fire `trigger` on the first signal from `next_signal`, then resolve with
/// the name of the second one.
pub async fn watch_signals<F, Fut>(trigger: ShutdownTrigger, mut next_signal: F) -> &'static str
where
    F: FnMut() -> Fut,
    Fut: Future<Output = &'static str>,
{
    let first = next_signal().await;
    info!(signal = first, "shutdown_requested");
    trigger.trigger();

    next_signal().await
}

/// Request a graceful shutdown on SIGINT or SIGTERM.
///
/// A second signal exits the process at once with status 1, for when a
/// broker call is stuck and the loops never reach an observation point.
pub async fn listen_for_signals(trigger: ShutdownTrigger) {
    let second = watch_signals(trigger, wait_for_signal).await;
    warn!(signal = second, "forced_exit");
    std::process::exit(1);
}
