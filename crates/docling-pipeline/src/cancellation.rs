//! Cooperative cancellation for long-running processor work (§4.3, §5).
//!
//! A [`CancellationToken`] is handed to every [`crate::processor::Processor`].
//! Long-running loops (the table parameter sweep, per-block language
//! detection, LLM batches) poll it at loop boundaries; on a positive check the
//! processor must leave the document in a consistent state — either commit a
//! unit of work fully or drop it, never half-mutated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cheaply cloneable flag threaded through a processor run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a fresh, non-cancelled token.
    #[must_use = "creates a new cancellation token"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use = "check whether cancellation was requested"]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Tracks a processor's overall time budget alongside its cancellation token,
/// per §5's "overall processor budget (default 10 min)". Checked at the same
/// loop boundaries as the token so a stuck processor degrades the same way a
/// cooperatively cancelled one does.
#[derive(Debug, Clone)]
pub struct Budget {
    token: CancellationToken,
    deadline: Instant,
}

impl Budget {
    /// Starts a budget of `duration` tied to `token`.
    #[must_use = "creates a new budget"]
    pub fn new(token: CancellationToken, duration: Duration) -> Self {
        Self {
            token,
            deadline: Instant::now() + duration,
        }
    }

    /// True once the token was cancelled or the deadline has passed.
    #[must_use = "check whether the budget is exhausted"]
    pub fn is_exhausted(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// The underlying cancellation token, for passing to sub-calls.
    #[must_use = "returns the underlying cancellation token"]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn cancel_is_observed() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn budget_exhausted_on_cancel() {
        let token = CancellationToken::new();
        let budget = Budget::new(token.clone(), Duration::from_secs(60));
        assert!(!budget.is_exhausted());
        token.cancel();
        assert!(budget.is_exhausted());
    }

    #[test]
    fn budget_exhausted_past_deadline() {
        let budget = Budget::new(CancellationToken::new(), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(budget.is_exhausted());
    }
}
