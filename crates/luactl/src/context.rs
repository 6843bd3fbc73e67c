//! cancellation carried through a sync run
//!
//! A [Context] fires once its deadline passes or once [Context::cancel] is called on any of its
//! clones. Work is never interrupted, callers poll [Context::check] between steps.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// Context that only fires when cancelled explicitly
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            // too far in the future to ever fire
            None => Self::background(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// The reason this context fired, if it did
    pub fn err(&self) -> Option<Cancelled> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Some(Cancelled::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Cancelled::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        match self.err() {
            Some(cancelled) => Err(cancelled),
            None => Ok(()),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancelled {
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error("context cancelled")]
    Cancelled,
}
