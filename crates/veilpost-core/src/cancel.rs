//! Cancellation of a single decryption invocation.

use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::DecryptError;

/// Cancellation signal threaded through every suspending step of one
/// invocation.
///
/// Fires when the caller's token is cancelled or when the optional deadline
/// passes, whichever comes first. Cheap to clone; clones observe the same
/// signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// Signal driven by a caller-owned token only.
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    /// Fresh signal that fires after `timeout`.
    ///
    /// Built per invocation; nothing is shared between invocations.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { token: CancellationToken::new(), deadline: Some(Instant::now() + timeout) }
    }

    /// Signal that never fires.
    pub fn never() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Returns true once the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Completes when the signal fires.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {},
                    () = tokio::time::sleep_until(deadline) => {},
                }
            },
            None => self.token.cancelled().await,
        }
    }

    /// Run `fut` unless the signal fires first.
    ///
    /// # Errors
    ///
    /// [`DecryptError::Cancelled`] if the signal fired before `fut` completed.
    /// `fut` is dropped in that case.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, DecryptError> {
        if self.is_cancelled() {
            return Err(DecryptError::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancelled() => Err(DecryptError::Cancelled),
            output = fut => Ok(output),
        }
    }

    /// Fire the signal. Affects every clone.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let signal = CancelSignal::never();
        assert_eq!(signal.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn token_cancellation_wins_over_pending_future() {
        let token = CancellationToken::new();
        let signal = CancelSignal::from_token(token.clone());
        token.cancel();

        let result = signal.run(future::pending::<()>()).await;

        assert_eq!(result, Err(DecryptError::Cancelled));
        assert!(signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires() {
        let signal = CancelSignal::with_timeout(Duration::from_secs(60));
        assert!(!signal.is_cancelled());

        let result = signal.run(future::pending::<()>()).await;

        assert_eq!(result, Err(DecryptError::Cancelled));
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_reaches_clones() {
        let signal = CancelSignal::never();
        let clone = signal.clone();

        signal.cancel();

        assert!(clone.is_cancelled());
    }
}
