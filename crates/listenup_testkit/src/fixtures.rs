//! Store fixtures.

use listenup_core::retry::{CancelToken, RetryPolicy};
use listenup_core::Config;
use listenup_store::{StoreConfig, StoreContext};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Retry policy for tests with many threads hitting the same keys.
///
/// Plenty of attempts, millisecond-scale backoff.
#[must_use]
pub fn contention_policy() -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(64)
        .with_base_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(20))
}

/// A store context with automatic cleanup.
pub struct TestContext {
    ctx: StoreContext,
    config: StoreConfig,
    temp_dir: Option<TempDir>,
}

impl TestContext {
    /// A context over a fresh in-memory database.
    pub fn memory() -> Self {
        Self::memory_with(StoreConfig::default().retry(contention_policy()))
    }

    /// A context over a fresh in-memory database with `config`.
    pub fn memory_with(config: StoreConfig) -> Self {
        let ctx = StoreContext::in_memory(config.clone()).expect("open in-memory store");
        Self {
            ctx,
            config,
            temp_dir: None,
        }
    }

    /// A context over a database in a new temporary directory.
    pub fn file() -> Self {
        let config = StoreConfig::default()
            .engine(Config::default().sync_on_commit(false))
            .retry(contention_policy());
        Self::file_with(config)
    }

    /// A context over a database in a new temporary directory with `config`.
    pub fn file_with(config: StoreConfig) -> Self {
        let temp_dir = TempDir::new().expect("create temp directory");
        let ctx = StoreContext::open(temp_dir.path(), config.clone()).expect("open store");
        Self {
            ctx,
            config,
            temp_dir: Some(temp_dir),
        }
    }

    /// The database directory, if on disk.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes the database and opens it again from disk.
    ///
    /// # Panics
    ///
    /// Panics for in-memory contexts.
    pub fn reopen(self) -> Self {
        let Self {
            ctx,
            config,
            temp_dir,
        } = self;
        let temp_dir = temp_dir.expect("reopen needs an on-disk context");
        ctx.close().expect("close store");
        drop(ctx);

        let ctx = StoreContext::open(temp_dir.path(), config.clone()).expect("reopen store");
        Self {
            ctx,
            config,
            temp_dir: Some(temp_dir),
        }
    }

    /// A fresh, never-cancelled token.
    pub fn cancel(&self) -> CancelToken {
        CancelToken::new()
    }

    /// The underlying context, for moving clones into threads.
    pub fn context(&self) -> &StoreContext {
        &self.ctx
    }
}

impl std::ops::Deref for TestContext {
    type Target = StoreContext;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

/// Runs `f` with a fresh in-memory context.
pub fn with_test_context<F, R>(f: F) -> R
where
    F: FnOnce(&TestContext) -> R,
{
    let ctx = TestContext::memory();
    f(&ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use listenup_store::Library;

    #[test]
    fn memory_context_works() {
        with_test_context(|ctx| {
            assert!(ctx.path().is_none());
            assert!(ctx.libraries().get_all_libraries().unwrap().is_empty());
        });
    }

    #[test]
    fn file_context_survives_reopen() {
        let ctx = TestContext::file();
        let library = Library::new("Kept");
        ctx.libraries().create_library(&ctx.cancel(), &library).unwrap();

        let ctx = ctx.reopen();
        assert_eq!(ctx.libraries().get_library_by_id(&library.id).unwrap(), library);
    }
}
