//! Retry executor.

use crate::retry::cancel::{CancelReason, CancelToken};
use crate::retry::policy::RetryPolicy;
use crate::retry::Transient;
use std::fmt;
use tracing::{debug, warn};

/// Why an executor run failed.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The work failed with a non-transient error; it was not retried.
    Permanent(E),
    /// Every attempt failed with a transient error.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: E,
    },
    /// The caller cancelled before or between attempts.
    Cancelled(CancelReason),
}

impl<E> RetryError<E> {
    /// Returns the underlying error, if an attempt produced one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Permanent(e) | Self::Exhausted { last: e, .. } => Some(e),
            Self::Cancelled(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permanent(e) => write!(f, "{e}"),
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            Self::Cancelled(reason) => write!(f, "{reason}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Permanent(e) | Self::Exhausted { last: e, .. } => Some(e),
            Self::Cancelled(_) => None,
        }
    }
}

/// Runs units of work under a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates an executor.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `work` until it succeeds, fails permanently, runs out of
    /// attempts, or `cancel` fires.
    ///
    /// `work` receives the 0-based attempt number and must redo all of its
    /// reads on every call. `operation` names the work in log events.
    ///
    /// # Errors
    ///
    /// - `Permanent` with the first non-transient error
    /// - `Exhausted` with the last error after `max_attempts` transient ones
    /// - `Cancelled` if the token fired before an attempt or during backoff
    pub fn run<T, E, F>(
        &self,
        cancel: &CancelToken,
        operation: &str,
        mut work: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Transient + fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            cancel.check().map_err(RetryError::Cancelled)?;

            let err = match work(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(RetryError::Permanent(e)),
                Err(e) => e,
            };

            attempt += 1;
            if attempt >= max_attempts {
                warn!(operation, attempts = attempt, error = %err, "retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.policy.delay_for_attempt(attempt - 1);
            debug!(operation, attempt, ?delay, error = %err, "transient failure, retrying");
            cancel.sleep(delay).map_err(RetryError::Cancelled)?;
        }
    }
}
