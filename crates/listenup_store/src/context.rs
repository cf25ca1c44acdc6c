//! The store context: one engine handle and one retry policy, shared by
//! every store.

use crate::auth::AuthStore;
use crate::error::{StoreError, StoreResult};
use crate::library::LibraryStore;
use crate::model::Server;
use crate::server::ServerStore;
use crate::user::UserStore;
use listenup_core::retry::{CancelToken, RetryExecutor, RetryPolicy};
use listenup_core::{Config, Database, WriteTxn};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Server name used when none is configured.
pub const DEFAULT_SERVER_NAME: &str = "ListenUp";

/// Everything needed to open a [`StoreContext`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Engine configuration.
    pub engine: Config,
    /// Retry policy for mutating operations.
    pub retry: RetryPolicy,
    /// Name given to the server record at bootstrap.
    pub server_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            engine: Config::default(),
            retry: RetryPolicy::default(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn engine(mut self, engine: Config) -> Self {
        self.engine = engine;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the server name used at bootstrap.
    #[must_use]
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }
}

#[derive(Debug)]
struct Inner {
    db: Database,
    executor: RetryExecutor,
    server_name: String,
}

/// Shared handle to the engine and retry executor.
///
/// Built once at startup and immutable afterwards. Cloning shares the same
/// engine; every store borrows the context rather than owning the engine.
#[derive(Debug, Clone)]
pub struct StoreContext {
    inner: Arc<Inner>,
}

impl StoreContext {
    /// Wraps an already opened database.
    #[must_use]
    pub fn new(db: Database, retry: RetryPolicy) -> Self {
        Self::build(db, retry, DEFAULT_SERVER_NAME.to_string())
    }

    fn build(db: Database, retry: RetryPolicy, server_name: String) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                executor: RetryExecutor::new(retry),
                server_name,
            }),
        }
    }

    /// Opens the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the engine cannot be opened.
    pub fn open(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        let db = Database::open_with_config(path, config.engine)?;
        Ok(Self::build(db, config.retry, config.server_name))
    }

    /// Opens an empty in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the engine cannot be created.
    pub fn in_memory(config: StoreConfig) -> StoreResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::build(db, config.retry, config.server_name))
    }

    /// The engine handle.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.inner.db
    }

    /// The retry executor used for mutations.
    #[must_use]
    pub fn executor(&self) -> &RetryExecutor {
        &self.inner.executor
    }

    /// The server singleton store.
    #[must_use]
    pub fn servers(&self) -> ServerStore<'_> {
        ServerStore::new(self)
    }

    /// The user store.
    #[must_use]
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(self)
    }

    /// The refresh token store.
    #[must_use]
    pub fn auth(&self) -> AuthStore<'_> {
        AuthStore::new(self)
    }

    /// The library store.
    #[must_use]
    pub fn libraries(&self) -> LibraryStore<'_> {
        LibraryStore::new(self)
    }

    /// Creates the server singleton if it does not exist yet and returns
    /// the stored record.
    ///
    /// # Errors
    ///
    /// Returns `Storage`, `Malformed`, `RetryExhausted` or `Cancelled`.
    pub fn bootstrap(&self, cancel: &CancelToken) -> StoreResult<Server> {
        let servers = self.servers();
        if let Some(server) = servers.get_server()? {
            return Ok(server);
        }

        let server = Server::generate(self.inner.server_name.clone());
        match servers.create_server(cancel, &server) {
            Ok(()) => info!(name = %self.inner.server_name, "bootstrapped server record"),
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e),
        }
        servers
            .get_server()?
            .ok_or_else(|| StoreError::not_found("server", "server"))
    }

    /// Closes the engine. Further operations fail with `Storage`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the final sync fails.
    pub fn close(&self) -> StoreResult<()> {
        self.inner.db.close()?;
        Ok(())
    }

    /// Runs `work` in a write transaction under the retry executor.
    ///
    /// Every attempt starts a fresh transaction, so `work` re-reads current
    /// state each time.
    pub(crate) fn mutate<T, F>(
        &self,
        cancel: &CancelToken,
        operation: &str,
        mut work: F,
    ) -> StoreResult<T>
    where
        F: FnMut(&mut WriteTxn<'_>) -> StoreResult<T>,
    {
        self.inner
            .executor
            .run(cancel, operation, |_| self.inner.db.update(&mut work))
            .map_err(StoreError::from)
    }
}
