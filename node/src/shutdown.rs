//! Process-wide shutdown for the gateway.
//!
//! The HTTP server, the metrics server and every organization's relay task
//! wait on [`ShutdownController::signalled`]. The first trigger, from an OS
//! signal or from code, is recorded with its reason and reaches all of them;
//! later triggers are ignored.

use std::fmt;
use std::future::Future;
use std::sync::OnceLock;

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Why the gateway is stopping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// [`ShutdownController::shutdown`] was called.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
            Self::Requested => "requested",
        })
    }
}

pub struct ShutdownController {
    notify: broadcast::Sender<()>,
    reason: OnceLock<ShutdownReason>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            reason: OnceLock::new(),
        }
    }

    /// Resolves once shutdown is triggered, immediately if it already was.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        // Subscribe before checking: `trigger` records the reason before it
        // notifies, so no trigger falls between the two.
        let mut rx = self.notify.subscribe();
        let triggered = self.is_triggered();
        async move {
            if !triggered {
                let _ = rx.recv().await;
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.reason.get().is_some()
    }

    /// The reason shutdown was first triggered for.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Stop the gateway from code.
    pub fn shutdown(&self) {
        self.trigger(ShutdownReason::Requested);
    }

    /// Record `reason` and notify every subscriber. Returns false when
    /// shutdown was already under way.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.reason.set(reason).is_err() {
            debug!(%reason, "shutdown already triggered");
            return false;
        }
        info!(%reason, subscribers = self.notify.receiver_count(), "shutting down gateway");
        let _ = self.notify.send(());
        true
    }

    /// Wait for SIGINT or SIGTERM, trigger shutdown and return which
    /// signal arrived.
    pub async fn wait_for_signal(&self) -> ShutdownReason {
        let reason = tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("failed to listen for SIGINT: {e}");
                }
                ShutdownReason::Interrupt
            }
            () = terminated() => ShutdownReason::Terminate,
        };
        self.trigger(reason);
        reason
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn terminated() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            warn!("failed to install SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminated() {
    std::future::pending::<()>().await;
}
