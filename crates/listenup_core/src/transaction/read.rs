//! Read operations and read-only transactions.

use crate::error::CoreResult;
use crate::mvcc::SnapshotGuard;
use crate::transaction::manager::TransactionManager;
use crate::types::SequenceNumber;
use bytes::Bytes;

/// Read operations available inside both kinds of transaction.
///
/// Methods take `&mut self` because write transactions record what they
/// read for commit-time validation.
pub trait ReadOps {
    /// Returns the value stored at `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` if the database was closed.
    fn get(&mut self, key: &[u8]) -> CoreResult<Option<Bytes>>;

    /// Returns up to `limit` entries whose key starts with `prefix`, in key
    /// order. `None` means no limit.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` if the database was closed.
    fn scan_prefix_limit(
        &mut self,
        prefix: &[u8],
        limit: Option<usize>,
    ) -> CoreResult<Vec<(Vec<u8>, Bytes)>>;

    /// Returns true if `key` holds a value.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` if the database was closed.
    fn contains(&mut self, key: &[u8]) -> CoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns every entry whose key starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` if the database was closed.
    fn scan_prefix(&mut self, prefix: &[u8]) -> CoreResult<Vec<(Vec<u8>, Bytes)>> {
        self.scan_prefix_limit(prefix, None)
    }

    /// Returns the first entry under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` if the database was closed.
    fn first_with_prefix(&mut self, prefix: &[u8]) -> CoreResult<Option<(Vec<u8>, Bytes)>> {
        Ok(self.scan_prefix_limit(prefix, Some(1))?.into_iter().next())
    }
}

/// A read-only, point-in-time view of the database.
#[derive(Debug)]
pub struct ReadTxn<'db> {
    manager: &'db TransactionManager,
    snapshot: SnapshotGuard<'db>,
}

impl<'db> ReadTxn<'db> {
    pub(crate) fn new(manager: &'db TransactionManager, snapshot: SnapshotGuard<'db>) -> Self {
        Self { manager, snapshot }
    }

    /// Sequence number this transaction reads at.
    #[must_use]
    pub fn snapshot_seq(&self) -> SequenceNumber {
        self.snapshot.seq()
    }
}

impl ReadOps for ReadTxn<'_> {
    fn get(&mut self, key: &[u8]) -> CoreResult<Option<Bytes>> {
        self.manager.get_at(key, self.snapshot.seq())
    }

    fn scan_prefix_limit(
        &mut self,
        prefix: &[u8],
        limit: Option<usize>,
    ) -> CoreResult<Vec<(Vec<u8>, Bytes)>> {
        self.manager.scan_at(prefix, self.snapshot.seq(), limit)
    }
}
