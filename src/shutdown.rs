//! Cooperative shutdown signal.
//!
//! Every bounded wait in the core (classifier polling, the OTP wait,
//! session provisioning, inter-attempt delays) selects against a
//! [`Shutdown`] receiver so an in-flight attempt can be aborted while still
//! running its cleanup tail.

use tokio::sync::watch;

// ============================================================================
// ShutdownHandle
// ============================================================================

/// Sender half; owned by the process entry point.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Signals shutdown to every subscribed [`Shutdown`] receiver.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Creates a new receiver.
    #[must_use]
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

// ============================================================================
// Shutdown
// ============================================================================

/// Receiver half; cheap to clone, one per suspension point.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Creates a linked handle/receiver pair.
    #[must_use]
    pub fn new() -> (ShutdownHandle, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownHandle { tx }, Shutdown { rx })
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when shutdown is requested. Never resolves otherwise.
    pub async fn triggered(&mut self) {
        // Already-signalled receivers resolve immediately.
        if *self.rx.borrow() {
            return;
        }
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
        // Sender dropped without signalling: park forever, the owning wait
        // has its own budget.
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
