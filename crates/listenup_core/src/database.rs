//! Database facade and recovery.

use crate::config::Config;
use crate::dir::DatabaseDir;
use crate::error::{CoreError, CoreResult};
use crate::transaction::{ReadTxn, TransactionManager, WriteTxn};
use crate::types::SequenceNumber;
use crate::wal::WalManager;
use listenup_storage::{FileLog, LogStore, MemoryLog};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Keys holding a live value.
    pub key_count: usize,
    /// Latest committed sequence number.
    pub committed_seq: SequenceNumber,
    /// Snapshots currently held by open transactions.
    pub live_snapshots: usize,
    /// Size of the write-ahead log in bytes.
    pub wal_size: u64,
}

/// The main database handle.
///
/// `Database` is an embedded, ordered key-value store with snapshot reads
/// and serializable write transactions. It is `Send + Sync`; share it by
/// reference or behind an `Arc`.
///
/// # Opening a Database
///
/// ```rust,no_run
/// use listenup_core::{Database, ReadOps};
/// use std::path::Path;
///
/// let db = Database::open(Path::new("listenup_data"))?;
///
/// db.update(|txn| {
///     txn.put("library:L1", "...");
///     Ok::<_, listenup_core::CoreError>(())
/// })?;
///
/// let value = db.view(|txn| txn.get(b"library:L1"))?;
/// assert!(value.is_some());
///
/// db.close()?;
/// # Ok::<(), listenup_core::CoreError>(())
/// ```
///
/// # In-Memory Databases
///
/// ```rust
/// let db = listenup_core::Database::open_in_memory().unwrap();
/// assert!(db.is_open());
/// ```
pub struct Database {
    config: Config,
    path: Option<PathBuf>,
    /// Held until close; `None` for databases without a directory.
    dir: Mutex<Option<DatabaseDir>>,
    txns: TransactionManager,
}

impl Database {
    /// Opens a database directory with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`open_with_config`](Self::open_with_config).
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database directory.
    ///
    /// Takes the directory lock, then replays every committed batch in the
    /// WAL. An incomplete batch at the end of the log is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another handle holds the directory (`DatabaseLocked`)
    /// - The directory is missing and `create_if_missing` is false
    /// - The WAL is corrupt (`WalCorruption`, `ChecksumMismatch`)
    /// - I/O fails
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = DatabaseDir::open(path, config.create_if_missing)?;
        let log = FileLog::open_with_create_dirs(&dir.wal_path())?;
        let txns = Self::recover(&config, Box::new(log))?;

        info!(path = %path.display(), committed_seq = %txns.committed_seq(), "database opened");
        Ok(Self {
            config,
            path: Some(dir.path().to_path_buf()),
            dir: Mutex::new(Some(dir)),
            txns,
        })
    }

    /// Opens an empty in-memory database.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches the other constructors.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_log(Config::default(), Box::new(MemoryLog::new()))
    }

    /// Opens a database over an arbitrary log, replaying it first.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or is corrupt.
    pub fn open_with_log(config: Config, log: Box<dyn LogStore>) -> CoreResult<Self> {
        let txns = Self::recover(&config, log)?;
        Ok(Self {
            config,
            path: None,
            dir: Mutex::new(None),
            txns,
        })
    }

    fn recover(config: &Config, log: Box<dyn LogStore>) -> CoreResult<TransactionManager> {
        let wal = WalManager::new(log, config.sync_on_commit);
        let (txns, report) = TransactionManager::recover(wal, config.max_wal_size)?;
        if report.committed_batches > 0 || report.discarded_bytes > 0 {
            info!(
                batches = report.committed_batches,
                discarded_bytes = report.discarded_bytes,
                committed_seq = %report.committed_seq,
                "recovered from WAL"
            );
        }
        Ok(txns)
    }

    /// Begins a read-only transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`close`](Self::close).
    pub fn begin_read(&self) -> CoreResult<ReadTxn<'_>> {
        self.txns.begin_read()
    }

    /// Begins a read-write transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`close`](Self::close).
    pub fn begin_write(&self) -> CoreResult<WriteTxn<'_>> {
        self.txns.begin_write()
    }

    /// Runs `f` against a read-only snapshot.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or `DatabaseClosed`.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut ReadTxn<'_>) -> Result<T, E>,
        E: From<CoreError>,
    {
        let mut txn = self.begin_read()?;
        f(&mut txn)
    }

    /// Runs `f` in a write transaction and commits it if `f` returns `Ok`.
    ///
    /// If `f` returns `Err`, nothing is written. The commit can fail with
    /// `Conflict`; the caller decides whether to run `f` again.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or the commit error converted into `E`.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T, E>,
        E: From<CoreError>,
    {
        let mut txn = self.begin_write()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.abort();
                Err(e)
            }
        }
    }

    /// Rewrites the WAL so it holds only the live keyspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is closed or the rewrite fails; the
    /// previous WAL stays in place in that case.
    pub fn checkpoint(&self) -> CoreResult<()> {
        self.txns.checkpoint()
    }

    /// Returns the latest committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.txns.committed_seq()
    }

    /// Returns engine statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL size cannot be read.
    pub fn stats(&self) -> CoreResult<DatabaseStats> {
        Ok(DatabaseStats {
            key_count: self.txns.key_count(),
            committed_seq: self.txns.committed_seq(),
            live_snapshots: self.txns.live_snapshots(),
            wal_size: self.txns.wal_size()?,
        })
    }

    /// Syncs the WAL, rejects further operations and releases the
    /// directory lock. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails.
    pub fn close(&self) -> CoreResult<()> {
        let result = self.txns.close();
        if self.dir.lock().take().is_some() {
            info!(path = ?self.path, "database closed");
        }
        result
    }

    /// Checks if the database is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.txns.is_closed()
    }

    /// Returns the database configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database directory, if the database lives on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("is_open", &self.is_open())
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close database cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ReadOps;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::tempdir;

    fn put(db: &Database, key: &str, value: &str) -> SequenceNumber {
        let mut txn = db.begin_write().unwrap();
        txn.put(key, value.to_string());
        txn.commit().unwrap()
    }

    fn get(db: &Database, key: &str) -> Option<String> {
        db.view(|txn| txn.get(key.as_bytes()))
            .unwrap()
            .map(|v| String::from_utf8(v.to_vec()).unwrap())
    }

    #[test]
    fn update_then_view() {
        let db = Database::open_in_memory().unwrap();
        db.update(|txn| {
            txn.put("user:1", "ann");
            txn.put("user:2", "bob");
            Ok::<_, CoreError>(())
        })
        .unwrap();

        assert_eq!(get(&db, "user:1").as_deref(), Some("ann"));
        let users = db.view(|txn| txn.scan_prefix(b"user:")).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(db.committed_seq(), SequenceNumber::new(1));
    }

    #[test]
    fn failed_closure_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let result = db.update(|txn| {
            txn.put("k", "v");
            Err::<(), _>(CoreError::invalid_operation("rejected"))
        });
        assert!(result.is_err());
        assert_eq!(get(&db, "k"), None);
        assert_eq!(db.stats().unwrap().wal_size, 0);
    }

    #[test]
    fn snapshot_isolation() {
        let db = Database::open_in_memory().unwrap();
        put(&db, "k", "old");

        let mut reader = db.begin_read().unwrap();
        put(&db, "k", "new");
        put(&db, "other", "x");

        assert_eq!(reader.get(b"k").unwrap().as_deref(), Some(&b"old"[..]));
        assert!(!reader.contains(b"other").unwrap());
        drop(reader);
        assert_eq!(get(&db, "k").as_deref(), Some("new"));
    }

    #[test]
    fn read_write_conflict() {
        let db = Database::open_in_memory().unwrap();
        put(&db, "library:L1", "v1");

        let mut a = db.begin_write().unwrap();
        let mut b = db.begin_write().unwrap();
        a.get(b"library:L1").unwrap();
        b.get(b"library:L1").unwrap();
        a.put("library:L1", "a");
        b.put("library:L1", "b");

        a.commit().unwrap();
        let err = b.commit().unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(get(&db, "library:L1").as_deref(), Some("a"));
    }

    #[test]
    fn blind_writes_conflict() {
        let db = Database::open_in_memory().unwrap();
        let mut a = db.begin_write().unwrap();
        let mut b = db.begin_write().unwrap();
        a.put("refresh_token:u1", "a");
        b.put("refresh_token:u1", "b");

        a.commit().unwrap();
        assert!(b.commit().unwrap_err().is_conflict());
    }

    #[test]
    fn disjoint_writes_both_commit() {
        let db = Database::open_in_memory().unwrap();
        let mut a = db.begin_write().unwrap();
        let mut b = db.begin_write().unwrap();
        a.put("user:1", "a");
        b.put("user:2", "b");
        a.commit().unwrap();
        b.commit().unwrap();
        assert_eq!(db.stats().unwrap().key_count, 2);
    }

    #[test]
    fn phantom_in_scanned_prefix_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let mut a = db.begin_write().unwrap();
        let mut b = db.begin_write().unwrap();

        assert!(a.first_with_prefix(b"email:ann@x.io\0").unwrap().is_none());
        assert!(b.first_with_prefix(b"email:ann@x.io\0").unwrap().is_none());
        a.put(b"email:ann@x.io\0u1".to_vec(), "u1");
        b.put(b"email:ann@x.io\0u2".to_vec(), "u2");

        a.commit().unwrap();
        assert!(b.commit().unwrap_err().is_conflict());
        let entries = db.view(|txn| txn.scan_prefix(b"email:ann@x.io\0")).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn unrelated_prefix_change_does_not_conflict() {
        let db = Database::open_in_memory().unwrap();
        let mut a = db.begin_write().unwrap();
        a.scan_prefix(b"email:ann@x.io\0").unwrap();
        a.put(b"email:ann@x.io\0u1".to_vec(), "u1");

        put(&db, "email:ann@x.io.uk\0u9", "u9");
        a.commit().unwrap();
    }

    #[test]
    fn reopen_restores_committed_state() {
        let temp = tempdir().unwrap();
        {
            let db = Database::open(temp.path()).unwrap();
            put(&db, "server", "s");
            put(&db, "user:1", "ann");
            db.update(|txn| {
                txn.delete("user:1");
                Ok::<_, CoreError>(())
            })
            .unwrap();
            db.close().unwrap();
        }

        let db = Database::open(temp.path()).unwrap();
        assert_eq!(get(&db, "server").as_deref(), Some("s"));
        assert_eq!(get(&db, "user:1"), None);
        assert_eq!(db.committed_seq(), SequenceNumber::new(3));
        assert_eq!(put(&db, "user:2", "bob"), SequenceNumber::new(4));
    }

    #[test]
    fn torn_tail_is_cut_on_open() {
        let temp = tempdir().unwrap();
        let wal_path = temp.path().join("wal.log");
        {
            let db = Database::open(temp.path()).unwrap();
            put(&db, "k", "v");
        }
        let good_len = std::fs::metadata(&wal_path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
        file.write_all(b"LUWL\x01\x00\x01\xff").unwrap();
        drop(file);

        let db = Database::open(temp.path()).unwrap();
        assert_eq!(get(&db, "k").as_deref(), Some("v"));
        assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), good_len);
    }

    #[test]
    fn corrupt_record_refuses_to_open() {
        let temp = tempdir().unwrap();
        let wal_path = temp.path().join("wal.log");
        {
            let db = Database::open(temp.path()).unwrap();
            put(&db, "k", "v");
        }
        let mut data = std::fs::read(&wal_path).unwrap();
        data[13] ^= 0xff;
        std::fs::write(&wal_path, data).unwrap();

        let result = Database::open(temp.path());
        assert!(matches!(result, Err(CoreError::ChecksumMismatch { .. })));
    }

    #[test]
    fn second_handle_is_locked_out() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        assert!(matches!(
            Database::open(temp.path()),
            Err(CoreError::DatabaseLocked)
        ));
        db.close().unwrap();
        assert!(Database::open(temp.path()).is_ok());
    }

    #[test]
    fn closed_handle_rejects_operations() {
        let db = Database::open_in_memory().unwrap();
        db.close().unwrap();
        assert!(!db.is_open());
        assert!(matches!(db.begin_read(), Err(CoreError::DatabaseClosed)));
        assert!(matches!(
            db.update(|_| Ok::<_, CoreError>(())),
            Err(CoreError::DatabaseClosed)
        ));
        db.close().unwrap();
    }

    #[test]
    fn stats_track_snapshots() {
        let db = Database::open_in_memory().unwrap();
        put(&db, "a", "1");
        let reader = db.begin_read().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.key_count, 1);
        assert_eq!(stats.live_snapshots, 1);
        assert!(stats.wal_size > 0);
        drop(reader);
        assert_eq!(db.stats().unwrap().live_snapshots, 0);
    }
}
