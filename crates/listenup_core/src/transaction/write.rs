//! Read-write transactions.

use crate::error::CoreResult;
use crate::mvcc::SnapshotGuard;
use crate::transaction::manager::TransactionManager;
use crate::transaction::read::ReadOps;
use crate::types::{SequenceNumber, TransactionId};
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use tracing::debug;

/// A read-write transaction.
///
/// Writes are buffered until [`commit`](Self::commit) and are visible to
/// this transaction's own reads. Dropping the transaction without
/// committing discards them.
pub struct WriteTxn<'db> {
    manager: &'db TransactionManager,
    snapshot: SnapshotGuard<'db>,
    id: TransactionId,
    /// Pending writes: key -> new value, `None` for a delete.
    writes: BTreeMap<Vec<u8>, Option<Bytes>>,
    /// Keys read from the snapshot.
    reads: BTreeSet<Vec<u8>>,
    /// Prefixes scanned from the snapshot.
    scanned: BTreeSet<Vec<u8>>,
}

impl<'db> WriteTxn<'db> {
    pub(crate) fn new(
        manager: &'db TransactionManager,
        snapshot: SnapshotGuard<'db>,
        id: TransactionId,
    ) -> Self {
        Self {
            manager,
            snapshot,
            id,
            writes: BTreeMap::new(),
            reads: BTreeSet::new(),
            scanned: BTreeSet::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Sequence number this transaction reads at.
    #[must_use]
    pub fn snapshot_seq(&self) -> SequenceNumber {
        self.snapshot.seq()
    }

    /// Number of keys this transaction will write.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Stores `value` at `key`.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Bytes>) {
        self.writes.insert(key.into(), Some(value.into()));
    }

    /// Removes `key`. Deleting an absent key is a no-op at commit.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.writes.insert(key.into(), None);
    }

    fn pending_in<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Option<Bytes>)> + 'a {
        self.writes
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
    }

    /// Validates and commits the transaction.
    ///
    /// A transaction without writes commits trivially and returns its
    /// snapshot sequence.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if another transaction committed a change this
    /// one depends on, or a storage error if the WAL append fails. Nothing
    /// is applied in either case.
    pub fn commit(self) -> CoreResult<SequenceNumber> {
        self.manager.commit(
            self.id,
            self.snapshot.seq(),
            &self.writes,
            &self.reads,
            &self.scanned,
        )
    }

    /// Discards the transaction.
    pub fn abort(self) {
        debug!(txid = %self.id, writes = self.writes.len(), "transaction aborted");
    }
}

impl ReadOps for WriteTxn<'_> {
    fn get(&mut self, key: &[u8]) -> CoreResult<Option<Bytes>> {
        if let Some(pending) = self.writes.get(key) {
            return Ok(pending.clone());
        }
        self.reads.insert(key.to_vec());
        self.manager.get_at(key, self.snapshot.seq())
    }

    fn scan_prefix_limit(
        &mut self,
        prefix: &[u8],
        limit: Option<usize>,
    ) -> CoreResult<Vec<(Vec<u8>, Bytes)>> {
        self.scanned.insert(prefix.to_vec());

        let deletes = self.pending_in(prefix).filter(|(_, v)| v.is_none()).count();
        let fetch = limit.map(|n| n.saturating_add(deletes));
        let mut merged: BTreeMap<Vec<u8>, Bytes> = self
            .manager
            .scan_at(prefix, self.snapshot.seq(), fetch)?
            .into_iter()
            .collect();

        for (key, value) in self.pending_in(prefix) {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }
}

impl std::fmt::Debug for WriteTxn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTxn")
            .field("id", &self.id)
            .field("snapshot", &self.snapshot.seq())
            .field("writes", &self.writes.len())
            .field("reads", &self.reads.len())
            .field("scanned", &self.scanned.len())
            .finish_non_exhaustive()
    }
}
