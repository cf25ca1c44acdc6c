//! Engine configuration.

/// WAL size that triggers an automatic checkpoint by default (16 MiB).
pub const DEFAULT_MAX_WAL_SIZE: u64 = 16 * 1024 * 1024;

/// Options for opening a [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct Config {
    /// Create the database directory when it is missing.
    pub create_if_missing: bool,

    /// WAL size in bytes past which a commit checkpoints the log.
    /// 0 disables automatic checkpoints.
    pub max_wal_size: u64,

    /// Fsync each commit batch before acknowledging it.
    pub sync_on_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_wal_size: DEFAULT_MAX_WAL_SIZE,
            sync_on_commit: true,
        }
    }
}

impl Config {
    /// Default options: create if missing, durable commits, 16 MiB WAL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether a missing directory is created.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the automatic checkpoint threshold.
    #[must_use]
    pub const fn max_wal_size(mut self, bytes: u64) -> Self {
        self.max_wal_size = bytes;
        self
    }

    /// Sets whether commits are fsynced.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }
}
