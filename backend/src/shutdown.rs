use std::time::Duration;

use tokio::sync::watch;

/// Creates the process-wide shutdown flag. Send `true` to stop background work.
pub fn channel() -> (watch::Sender<bool>, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (tx, ShutdownSignal(rx))
}

/// Observed by timers, sweeps and WebSocket sessions before they act.
#[derive(Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once shutdown is requested. Never resolves if the sender is
    /// dropped without signalling.
    pub async fn wait(&mut self) {
        let closed = self.0.wait_for(|stop| *stop).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Sleeps for `duration`; returns `false` if shutdown arrived first.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }
        let slept = tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.wait() => false,
        };
        slept && !self.is_triggered()
    }
}
