//! Module: executor::cancel
//! Responsibility: cooperative cancellation signal with an optional deadline.
//! Does not own: deciding when to cancel or discarding partial state.
//! Boundary: polled by doc-id sources and the orchestrator between blocks.

use std::time::Instant;
use tokio_util::sync::CancellationToken as SignalToken;

///
/// CancellationToken
///
/// Cooperative stop signal shared between the caller and one running query.
/// Clones observe the same signal. Operators poll it between blocks, never
/// mid-block.
///

#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    signal: SignalToken,
    deadline: Option<Instant>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a token that also reports cancellation once `deadline` passes.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            signal: SignalToken::new(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.signal.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

///
/// TESTS
///
