//! Cancellation and deadline token passed through to engines.
//!
//! `rowfn` never inspects a [`Context`] itself. Statement calls forward the
//! caller's context unchanged so the engine can abandon work when the
//! caller gives up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a [`Context`] is done.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation flag of one context, linked to the flag it derives from.
#[derive(Debug, Default)]
struct CancelFlag {
    canceled: AtomicBool,
    parent: Option<Arc<CancelFlag>>,
}

impl CancelFlag {
    fn is_set(&self) -> bool {
        let mut flag = Some(self);
        while let Some(current) = flag {
            if current.canceled.load(Ordering::Acquire) {
                return true;
            }
            flag = current.parent.as_deref();
        }
        false
    }
}

/// Cloneable cancellation/deadline token.
///
/// Clones share the cancellation flag: canceling any clone cancels all of
/// them. Derived contexts (`with_timeout`, `with_deadline`) get their own
/// flag, see their parent's cancellation, and keep the earlier of the two
/// deadlines. Canceling a derived context leaves its parent untouched.
#[derive(Clone, Debug, Default)]
pub struct Context {
    flag: Arc<CancelFlag>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done unless canceled.
    pub fn background() -> Self {
        Context::default()
    }

    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Context {
            flag: Arc::new(CancelFlag {
                canceled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.flag)),
            }),
            deadline: Some(deadline),
        }
    }

    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context, its clones, and every context derived from it.
    pub fn cancel(&self) {
        self.flag.canceled.store(true, Ordering::Release);
    }

    /// `Some` once the context is canceled or past its deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.flag.is_set() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }
}
