//! Shutdown signalling.
//!
//! One [`ShutdownTrigger`] fans a single shutdown event out to any number of
//! [`ShutdownWatch`] clones through a `watch` channel. Firing is sticky: a
//! watch created or polled after the trigger fired resolves immediately.

use tokio::sync::watch;
use tracing::warn;

/// Sending half of the shutdown channel.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownWatch {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger/watch pair.
#[must_use]
pub fn channel() -> (ShutdownTrigger, ShutdownWatch) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownWatch { rx })
}

impl ShutdownTrigger {
    /// Signal shutdown to every watch.
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

impl ShutdownWatch {
    /// Whether shutdown has been signalled.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is signalled.
    ///
    /// A dropped trigger counts as shutdown.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            warn!("shutdown trigger dropped, stopping");
        }
    }
}

/// Resolve on SIGTERM or Ctrl-C.
///
/// If the SIGTERM handler cannot be installed, only Ctrl-C is watched.
pub async fn terminate_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_should_fan_out_to_all_watches() {
        let (trigger, watch) = channel();
        let mut a = watch.clone();
        let mut b = watch;
        assert!(!a.is_shutdown());

        let waiter = tokio::spawn(async move {
            a.wait().await;
            a.is_shutdown()
        });
        trigger.fire();
        assert!(waiter.await.unwrap());
        tokio::time::timeout(Duration::from_secs(1), b.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_should_resolve_late_watch_immediately() {
        let (trigger, mut watch) = channel();
        trigger.fire();
        trigger.fire();
        tokio::time::timeout(Duration::from_millis(100), watch.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_should_stop_when_trigger_dropped() {
        let (trigger, mut watch) = channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_millis(100), watch.wait())
            .await
            .unwrap();
    }
}
