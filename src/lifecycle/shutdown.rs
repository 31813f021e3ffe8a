//! Shutdown broadcast shared by the server and the health monitors.

use std::future::Future;

use tokio::sync::broadcast;

/// Clonable handle on the gateway's shutdown broadcast.
///
/// Receivers must subscribe before [`Shutdown::trigger`]; a trigger is not
/// replayed to later subscribers.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for monitor loops that poll the broadcast in `select!`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Future resolving on the next trigger, subscribed at call time.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Fire the broadcast. No-op when nobody is listening.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_clones() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.clone().subscribe();
        let signalled = shutdown.signalled();

        shutdown.trigger();
        assert!(rx.recv().await.is_ok());
        tokio::time::timeout(Duration::from_secs(1), signalled)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_without_listeners() {
        Shutdown::default().trigger();
    }
}
