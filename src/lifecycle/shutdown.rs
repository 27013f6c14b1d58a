//! Shutdown coordination for the agent server.
//!
//! `main` owns one [`Shutdown`] and hands a receiver to `HttpServer::run`.
//! The server stops accepting connections at whichever comes first: an OS
//! signal or [`Shutdown::trigger`]. In-flight HTTP requests finish; open
//! realtime sockets are dropped with the server. Integration tests trigger
//! the coordinator to stop servers they spawned on ephemeral ports.

use tokio::sync::broadcast;

use crate::lifecycle::signals::shutdown_signal;

/// Why the server is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C or SIGTERM.
    Signal,
    /// [`Shutdown::trigger`] fired, or every coordinator was dropped.
    Triggered,
}

/// In-process stop switch shared by the server and its owner.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Stop every subscribed server. Returns how many receivers were told.
    pub fn trigger(&self) -> usize {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::debug!(receivers = notified, "Shutdown triggered");
        notified
    }

    /// Servers still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `rx` fires or its coordinator is gone.
pub async fn wait(mut rx: broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}

/// Resolve on the first OS signal or coordinator trigger.
pub async fn requested(rx: broadcast::Receiver<()>) -> ShutdownReason {
    tokio::select! {
        _ = shutdown_signal() => ShutdownReason::Signal,
        _ = wait(rx) => ShutdownReason::Triggered,
    }
}
