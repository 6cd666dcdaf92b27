use tokio::sync::watch;

/// Lifecycle of a gateway connection as seen by waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Connecting, or not connected yet.
    Pending,
    Ready,
    /// The connection ended without a reconnect under way.
    Stopped,
}

/// Connection readiness flag that async callers can wait on.
///
/// Waiting is level-triggered: a waiter arriving after the gate opened
/// returns immediately, and any number of waiters may wait concurrently.
/// A stopped connection also releases waiters, so nobody waits on a session
/// that will never come up.
#[derive(Debug)]
pub struct ReadinessGate {
    tx: watch::Sender<Readiness>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Readiness::Pending);
        Self { tx }
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(Readiness::Ready);
    }

    pub fn mark_not_ready(&self) {
        self.tx.send_replace(Readiness::Pending);
    }

    pub fn mark_stopped(&self) {
        self.tx.send_replace(Readiness::Stopped);
    }

    pub fn state(&self) -> Readiness {
        *self.tx.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == Readiness::Ready
    }

    /// Suspend until the gate is open or the connection has stopped.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state != Readiness::Pending).await;
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
