//! Cooperative cancellation shared by every task of one batch.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A cooperative stop token shared across one batch.
///
/// The signal starts out active. Any holder may call [Self::signal] to
/// transition it to cancelled, it never transitions back. Clones observe
/// the same state. Nothing on the signal itself blocks or fails. Waiting
/// only happens in code that chooses to observe it via [Self::cancelled].
///
/// Create one signal per batch and drop it when the batch is done.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal(CancellationToken);

impl CancellationSignal {
    /// Construct a new, active signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the signal to cancelled. Signalling an already cancelled
    /// signal is a no-op.
    pub fn signal(&self) {
        self.0.cancel();
    }

    /// Non-blocking poll of the signal state.
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once the signal has been flipped. Resolves immediately if
    /// that already happened.
    pub async fn cancelled(&self) {
        self.0.cancelled().await
    }

    /// Signal after `delay` has elapsed.
    ///
    /// This is how timeouts are layered onto a batch: the orchestrators
    /// cannot tell a timer-triggered cancellation from a user-triggered
    /// one. The timer task ends early if the signal is flipped by someone
    /// else first. Must be called from within a tokio runtime.
    pub fn cancel_after(&self, delay: Duration) {
        let token = self.0.clone();
        tokio::task::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => (),
                _ = tokio::time::sleep(delay) => token.cancel(),
            }
        });
    }
}
