/*!
 * Cooperative cancellation shared by all workers of a run.
 *
 * A token wraps a tokio-util cancellation token. Workers look at it
 * at loop-top, before each retry, and while sleeping between requests; an
 * in-flight request is never aborted.
 */

use std::time::Duration;

/// Handle to a run's stop flag; clones share the flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: tokio_util::sync::CancellationToken,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake sleeping workers. Calling it again is a no-op.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Sleep for `duration` or until cancelled, whichever comes first.
    ///
    /// Returns `true` when the token is cancelled.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_cancelled(),
            _ = self.inner.cancelled() => true,
        }
    }
}
