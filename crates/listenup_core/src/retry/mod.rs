//! Bounded retry of whole units of work on transient failures.
//!
//! A commit conflict means the snapshot a unit of work read from is stale,
//! so the only correct recovery is to run the entire read-modify-write
//! again against a fresh snapshot. [`RetryExecutor`] does exactly that,
//! with exponential backoff and jitter between attempts, and gives up after
//! a fixed number of attempts.
//!
//! ```rust
//! use listenup_core::retry::{CancelToken, RetryExecutor, RetryPolicy};
//! use listenup_core::{CoreError, Database, ReadOps};
//!
//! let db = Database::open_in_memory().unwrap();
//! let executor = RetryExecutor::new(RetryPolicy::default());
//!
//! let count = executor
//!     .run(&CancelToken::new(), "bump", |_attempt| {
//!         db.update(|txn| {
//!             let n = txn.get(b"n")?.map_or(0, |v| v.len());
//!             txn.put("n", vec![0u8; n + 1]);
//!             Ok::<_, CoreError>(n + 1)
//!         })
//!     })
//!     .unwrap();
//! assert_eq!(count, 1);
//! ```

mod cancel;
mod executor;
mod policy;

pub use cancel::{CancelReason, CancelToken};
pub use executor::{RetryError, RetryExecutor};
pub use policy::RetryPolicy;

use crate::error::CoreError;

/// Classifies a failure as worth retrying or not.
///
/// Only contention is transient. Everything else, including not-found and
/// validation failures, is permanent and returned to the caller unchanged.
pub trait Transient {
    /// Returns true if running the same work again may succeed.
    fn is_transient(&self) -> bool;
}

impl Transient for CoreError {
    fn is_transient(&self) -> bool {
        self.is_conflict()
    }
}
