//! Cooperative cancellation with optional deadlines.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a wait or an operation was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// [`CancelToken::cancel`] was called.
    Cancelled,
    /// The token's deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("operation cancelled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
    deadline: Option<Instant>,
}

/// A caller's cancellation signal.
///
/// Clones share state: cancelling any clone cancels all of them, and wakes
/// every thread blocked in [`sleep`](Self::sleep).
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// A token that is only cancelled explicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A token that also expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    /// A token that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Instant::now().checked_add(timeout))
    }

    fn build(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: Mutex::new(false),
                wake: Condvar::new(),
                deadline,
            }),
        }
    }

    /// Cancels the token and wakes all sleepers.
    pub fn cancel(&self) {
        *self.inner.cancelled.lock() = true;
        self.inner.wake.notify_all();
    }

    /// Returns true once the token is cancelled or past its deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Fails if the token is cancelled or expired.
    ///
    /// # Errors
    ///
    /// Returns the reason the token is no longer live.
    pub fn check(&self) -> Result<(), CancelReason> {
        if *self.inner.cancelled.lock() {
            return Err(CancelReason::Cancelled);
        }
        if self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(CancelReason::DeadlineExceeded);
        }
        Ok(())
    }

    /// Blocks for `duration` unless the token is cancelled or expires first.
    ///
    /// # Errors
    ///
    /// Returns the reason the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> Result<(), CancelReason> {
        let wake_at = Instant::now() + duration;
        let until = self.inner.deadline.map_or(wake_at, |d| d.min(wake_at));

        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self.inner.wake.wait_until(&mut cancelled, until).timed_out() {
                break;
            }
        }
        if *cancelled {
            return Err(CancelReason::Cancelled);
        }
        drop(cancelled);

        if self.inner.deadline.is_some_and(|d| d <= wake_at && Instant::now() >= d) {
            return Err(CancelReason::DeadlineExceeded);
        }
        Ok(())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &*self.inner.cancelled.lock())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fresh_token_is_live() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        assert!(token.sleep(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn cancel_is_shared_by_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert_eq!(token.check(), Err(CancelReason::Cancelled));
    }

    #[test]
    fn cancel_wakes_sleeper() {
        let token = CancelToken::new();
        let sleeper = token.clone();
        let start = Instant::now();
        let handle = thread::spawn(move || sleeper.sleep(Duration::from_secs(30)));

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert_eq!(handle.join().unwrap(), Err(CancelReason::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn deadline_cuts_sleep_short() {
        let token = CancelToken::with_timeout(Duration::from_millis(20));
        let start = Instant::now();
        assert_eq!(
            token.sleep(Duration::from_secs(30)),
            Err(CancelReason::DeadlineExceeded)
        );
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(token.is_cancelled());
    }

    #[test]
    fn expired_deadline_fails_check() {
        let token = CancelToken::with_deadline(Instant::now());
        assert_eq!(token.check(), Err(CancelReason::DeadlineExceeded));
    }
}
