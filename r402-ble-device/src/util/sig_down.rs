//! Shutdown on SIGTERM/SIGINT (Ctrl+C elsewhere).

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Turns the first OS shutdown signal into a cancelled [`CancellationToken`].
///
/// The listener, every connection and the device's main loop share clones
/// of the token, so one signal stops accepting peers and lets in-flight
/// payments finish.
#[allow(missing_debug_implementations)] // TaskTracker doesn't impl Debug
pub struct SigDown {
    tracker: TaskTracker,
    token: CancellationToken,
}

impl SigDown {
    /// Installs the signal handlers on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if a signal handler cannot be registered.
    #[allow(clippy::unnecessary_wraps)] // fallible only on Unix
    pub fn try_new() -> Result<Self, std::io::Error> {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let tracker = TaskTracker::new();

        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            tracker.spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                    _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down"),
                    () = trigger.cancelled() => return,
                }
                trigger.cancel();
            });
        }

        #[cfg(not(unix))]
        {
            tracker.spawn(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl-C, shutting down"),
                    () = trigger.cancelled() => return,
                }
                trigger.cancel();
            });
        }

        tracker.close();
        Ok(Self { tracker, token })
    }

    /// A token cancelled on the first shutdown signal.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Triggers shutdown without a signal.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits until shutdown has been triggered and the signal task has exited.
    pub async fn recv(&self) {
        self.token.cancelled().await;
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_manual_cancel_releases_waiters() {
        let sig_down = SigDown::try_new().unwrap();
        let token = sig_down.cancellation_token();
        assert!(!token.is_cancelled());
        sig_down.cancel();
        tokio::time::timeout(Duration::from_secs(1), sig_down.recv())
            .await
            .unwrap();
        assert!(token.is_cancelled());
    }
}
