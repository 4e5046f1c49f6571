//! Cooperative stop signal for the background loops

use tokio::sync::watch;

/// Trigger side, held by whoever owns the process lifecycle.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Listener side, cloned into every background task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, ShutdownSignal { rx })
    }

    pub fn trigger(&self) {
        // send_replace never fails, even with every listener gone
        self.tx.send_replace(true);
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered or the trigger was dropped.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_wakes_listeners() {
        let (shutdown, signal) = Shutdown::new();
        let mut a = signal.clone();
        let mut b = signal;

        assert!(!a.is_triggered());
        shutdown.trigger();
        a.recv().await;
        b.recv().await;
        assert!(b.is_triggered());
    }

    #[tokio::test]
    async fn test_dropped_trigger_releases_listeners() {
        let (shutdown, mut signal) = Shutdown::new();
        drop(shutdown);
        signal.recv().await;
    }
}
