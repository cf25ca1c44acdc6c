//! Transaction manager.

use crate::error::{CoreError, CoreResult};
use crate::mvcc::{Keyspace, SnapshotGuard, SnapshotRegistry};
use crate::transaction::read::ReadTxn;
use crate::transaction::write::WriteTxn;
use crate::types::{SequenceNumber, TransactionId};
use crate::wal::{WalManager, WalRecord};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Owns the keyspace, the WAL and the commit path.
///
/// ## Concurrency
///
/// - Readers take a snapshot and read under a shared lock; they never wait
///   for a commit to finish validating.
/// - Writers run optimistically and are serialized only at commit, where
///   validation, the WAL append and publication happen under `commit_lock`.
pub(crate) struct TransactionManager {
    wal: WalManager,
    keyspace: RwLock<Keyspace>,
    snapshots: SnapshotRegistry,
    next_txid: AtomicU64,
    commit_lock: Mutex<()>,
    max_wal_size: u64,
    closed: AtomicBool,
}

/// Summary of what recovery found in the WAL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RecoveryReport {
    pub(crate) committed_batches: usize,
    pub(crate) discarded_bytes: u64,
    pub(crate) committed_seq: SequenceNumber,
}

impl TransactionManager {
    /// Rebuilds the keyspace from the committed batches in `wal`.
    ///
    /// Records after the last `Commit` (an interrupted batch or a torn
    /// record) are cut off the log.
    pub(crate) fn recover(wal: WalManager, max_wal_size: u64) -> CoreResult<(Self, RecoveryReport)> {
        let contents = wal.read_all()?;

        let mut keyspace = Keyspace::new();
        let mut pending: HashMap<TransactionId, Vec<(Vec<u8>, Option<Bytes>)>> = HashMap::new();
        let mut committed = SequenceNumber::default();
        let mut max_txid = 0;
        let mut batches = 0;

        for record in contents.records {
            max_txid = max_txid.max(record.txid().as_u64());
            match record {
                WalRecord::Put { txid, key, value } => {
                    pending
                        .entry(txid)
                        .or_default()
                        .push((key, Some(Bytes::from(value))));
                }
                WalRecord::Delete { txid, key } => {
                    pending.entry(txid).or_default().push((key, None));
                }
                WalRecord::Commit { txid, sequence } => {
                    if sequence < committed {
                        return Err(CoreError::wal_corruption(format!(
                            "commit {sequence} after {committed}"
                        )));
                    }
                    for (key, value) in pending.remove(&txid).unwrap_or_default() {
                        keyspace.apply(key, value, sequence);
                    }
                    committed = sequence;
                    batches += 1;
                }
            }
        }

        let size = wal.size()?;
        let discarded_bytes = size - contents.committed_len;
        if discarded_bytes > 0 {
            warn!(
                discarded_bytes,
                uncommitted_txns = pending.len(),
                "discarding WAL tail after last commit"
            );
            wal.truncate(contents.committed_len)?;
        }

        keyspace.prune_all(committed);

        let manager = Self {
            wal,
            keyspace: RwLock::new(keyspace),
            snapshots: SnapshotRegistry::new(committed),
            next_txid: AtomicU64::new(max_txid + 1),
            commit_lock: Mutex::new(()),
            max_wal_size,
            closed: AtomicBool::new(false),
        };
        let report = RecoveryReport {
            committed_batches: batches,
            discarded_bytes,
            committed_seq: committed,
        };
        Ok((manager, report))
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CoreError::DatabaseClosed);
        }
        Ok(())
    }

    fn snapshot(&self) -> CoreResult<SnapshotGuard<'_>> {
        self.ensure_open()?;
        Ok(self.snapshots.acquire())
    }

    /// Begins a read-only transaction at the latest committed sequence.
    pub(crate) fn begin_read(&self) -> CoreResult<ReadTxn<'_>> {
        Ok(ReadTxn::new(self, self.snapshot()?))
    }

    /// Begins a read-write transaction at the latest committed sequence.
    pub(crate) fn begin_write(&self) -> CoreResult<WriteTxn<'_>> {
        let snapshot = self.snapshot()?;
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        Ok(WriteTxn::new(self, snapshot, txid))
    }

    pub(crate) fn get_at(&self, key: &[u8], snapshot: SequenceNumber) -> CoreResult<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self.keyspace.read().get_at(key, snapshot))
    }

    pub(crate) fn scan_at(
        &self,
        prefix: &[u8],
        snapshot: SequenceNumber,
        limit: Option<usize>,
    ) -> CoreResult<Vec<(Vec<u8>, Bytes)>> {
        self.ensure_open()?;
        Ok(self.keyspace.read().scan_at(prefix, snapshot, limit))
    }

    /// Validates a write transaction against everything committed after its
    /// snapshot, then makes it durable and visible under a new sequence.
    pub(crate) fn commit(
        &self,
        txid: TransactionId,
        snapshot: SequenceNumber,
        writes: &BTreeMap<Vec<u8>, Option<Bytes>>,
        reads: &BTreeSet<Vec<u8>>,
        scanned: &BTreeSet<Vec<u8>>,
    ) -> CoreResult<SequenceNumber> {
        let _guard = self.commit_lock.lock();
        self.ensure_open()?;

        if writes.is_empty() {
            return Ok(snapshot);
        }

        self.validate(txid, snapshot, writes, reads, scanned)?;

        let sequence = self.snapshots.committed().next();
        let mut records: Vec<WalRecord> = writes
            .iter()
            .map(|(key, value)| match value {
                Some(value) => WalRecord::Put {
                    txid,
                    key: key.clone(),
                    value: value.to_vec(),
                },
                None => WalRecord::Delete {
                    txid,
                    key: key.clone(),
                },
            })
            .collect();
        records.push(WalRecord::Commit { txid, sequence });
        self.wal.append_batch(&records)?;

        {
            let mut keyspace = self.keyspace.write();
            for (key, value) in writes {
                keyspace.apply(key.clone(), value.clone(), sequence);
            }
            let oldest = self.snapshots.publish(sequence);
            for key in writes.keys() {
                keyspace.prune(key, oldest);
            }
        }

        debug!(%txid, %sequence, writes = writes.len(), "transaction committed");

        if self.max_wal_size > 0 && self.wal.size()? > self.max_wal_size {
            if let Err(e) = self.checkpoint_locked() {
                warn!(error = %e, "automatic checkpoint failed");
            }
        }

        Ok(sequence)
    }

    fn validate(
        &self,
        txid: TransactionId,
        snapshot: SequenceNumber,
        writes: &BTreeMap<Vec<u8>, Option<Bytes>>,
        reads: &BTreeSet<Vec<u8>>,
        scanned: &BTreeSet<Vec<u8>>,
    ) -> CoreResult<()> {
        let keyspace = self.keyspace.read();

        for key in reads.iter().chain(writes.keys()) {
            if keyspace.latest_seq(key).is_some_and(|seq| seq > snapshot) {
                debug!(%txid, %snapshot, "write-write or read-write conflict");
                return Err(CoreError::conflict(key));
            }
        }

        for prefix in scanned {
            if let Some(key) = keyspace.changed_in_prefix_since(prefix, snapshot) {
                debug!(%txid, %snapshot, "phantom in scanned prefix");
                return Err(CoreError::conflict(&key));
            }
        }

        Ok(())
    }

    /// Rewrites the WAL as a single batch holding the live keyspace.
    pub(crate) fn checkpoint(&self) -> CoreResult<()> {
        let _guard = self.commit_lock.lock();
        self.ensure_open()?;
        self.checkpoint_locked()
    }

    fn checkpoint_locked(&self) -> CoreResult<()> {
        let before = self.wal.size()?;
        let sequence = self.snapshots.committed();
        let txid = TransactionId::new(0);

        let mut records: Vec<WalRecord> = self
            .keyspace
            .read()
            .live_entries()
            .map(|(key, value)| WalRecord::Put {
                txid,
                key: key.to_vec(),
                value: value.to_vec(),
            })
            .collect();
        let keys = records.len();
        records.push(WalRecord::Commit { txid, sequence });

        self.wal.replace(&records)?;
        self.keyspace.write().prune_all(self.snapshots.oldest());

        info!(%sequence, keys, before, after = self.wal.size()?, "checkpoint complete");
        Ok(())
    }

    /// Syncs the WAL and rejects every later operation.
    pub(crate) fn close(&self) -> CoreResult<()> {
        let _guard = self.commit_lock.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.wal.sync()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn committed_seq(&self) -> SequenceNumber {
        self.snapshots.committed()
    }

    pub(crate) fn live_snapshots(&self) -> usize {
        self.snapshots.live_count()
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keyspace.read().live_count()
    }

    pub(crate) fn wal_size(&self) -> CoreResult<u64> {
        self.wal.size()
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("committed_seq", &self.committed_seq())
            .field("live_snapshots", &self.live_snapshots())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ReadOps;
    use listenup_storage::MemoryLog;

    fn manager() -> TransactionManager {
        let wal = WalManager::new(Box::new(MemoryLog::new()), true);
        TransactionManager::recover(wal, 0).unwrap().0
    }

    fn recover(log: &MemoryLog) -> (TransactionManager, RecoveryReport) {
        let wal = WalManager::new(Box::new(log.clone()), true);
        TransactionManager::recover(wal, 0).unwrap()
    }

    #[test]
    fn empty_commit_keeps_sequence() {
        let tm = manager();
        let txn = tm.begin_write().unwrap();
        assert_eq!(txn.commit().unwrap(), SequenceNumber::new(0));
        assert_eq!(tm.committed_seq(), SequenceNumber::new(0));
    }

    #[test]
    fn commits_get_consecutive_sequences() {
        let tm = manager();
        for n in 1..=3 {
            let mut txn = tm.begin_write().unwrap();
            txn.put(format!("k{n}"), "v");
            assert_eq!(txn.commit().unwrap(), SequenceNumber::new(n));
        }
        assert_eq!(tm.key_count(), 3);
    }

    #[test]
    fn own_writes_visible_before_commit() {
        let tm = manager();
        let mut txn = tm.begin_write().unwrap();
        txn.put("user:1", "ann");
        assert_eq!(txn.get(b"user:1").unwrap().as_deref(), Some(&b"ann"[..]));
        txn.delete("user:1");
        assert_eq!(txn.get(b"user:1").unwrap(), None);
    }

    #[test]
    fn write_scan_merges_pending_changes() {
        let tm = manager();
        let mut setup = tm.begin_write().unwrap();
        setup.put("p:a", "1");
        setup.put("p:b", "2");
        setup.put("p:c", "3");
        setup.commit().unwrap();

        let mut txn = tm.begin_write().unwrap();
        txn.delete("p:a");
        txn.put("p:bb", "new");
        let keys: Vec<_> = txn
            .scan_prefix_limit(b"p:", Some(2))
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"p:b".to_vec(), b"p:bb".to_vec()]);
        assert_eq!(txn.scan_prefix(b"p:").unwrap().len(), 3);
    }

    #[test]
    fn aborted_writes_are_discarded() {
        let tm = manager();
        let mut txn = tm.begin_write().unwrap();
        txn.put("k", "v");
        txn.abort();
        assert_eq!(tm.key_count(), 0);
        assert_eq!(tm.wal_size().unwrap(), 0);
    }

    #[test]
    fn recovery_ignores_uncommitted_batch() {
        let log = MemoryLog::new();
        {
            let tm = recover(&log).0;
            let mut txn = tm.begin_write().unwrap();
            txn.put("a", "1");
            txn.commit().unwrap();
        }
        let committed_size = log.snapshot().len();
        let dangling = WalRecord::Put {
            txid: TransactionId::new(99),
            key: b"b".to_vec(),
            value: b"2".to_vec(),
        };
        let wal = WalManager::new(Box::new(log.clone()), true);
        wal.append_batch(&[dangling]).unwrap();

        let (tm, report) = recover(&log);
        assert_eq!(report.committed_batches, 1);
        assert!(report.discarded_bytes > 0);
        assert_eq!(log.snapshot().len(), committed_size);
        assert_eq!(tm.key_count(), 1);
        assert_eq!(tm.begin_write().unwrap().id(), TransactionId::new(100));
    }

    #[test]
    fn failed_append_does_not_corrupt_later_commits() {
        let log = MemoryLog::new();
        {
            let tm = recover(&log).0;
            let mut txn = tm.begin_write().unwrap();
            txn.put("a", "1");
            txn.commit().unwrap();

            log.fail_next_append_after(9);
            let mut txn = tm.begin_write().unwrap();
            txn.put("b", "2");
            assert!(matches!(txn.commit(), Err(CoreError::Storage(_))));

            let mut txn = tm.begin_write().unwrap();
            txn.put("c", "3");
            assert_eq!(txn.commit().unwrap(), SequenceNumber::new(2));
        }

        let (tm, report) = recover(&log);
        assert_eq!(report.committed_batches, 2);
        assert_eq!(report.discarded_bytes, 0);
        let mut read = tm.begin_read().unwrap();
        assert_eq!(read.get(b"a").unwrap().as_deref(), Some(&b"1"[..]));
        assert_eq!(read.get(b"b").unwrap(), None);
        assert_eq!(read.get(b"c").unwrap().as_deref(), Some(&b"3"[..]));
    }

    #[test]
    fn checkpoint_keeps_only_live_data() {
        let log = MemoryLog::new();
        {
            let tm = recover(&log).0;
            for n in 0..10 {
                let mut txn = tm.begin_write().unwrap();
                txn.put("counter", n.to_string());
                txn.put(format!("tmp{n}"), "x");
                txn.commit().unwrap();
                let mut txn = tm.begin_write().unwrap();
                txn.delete(format!("tmp{n}"));
                txn.commit().unwrap();
            }
            let before = tm.wal_size().unwrap();
            tm.checkpoint().unwrap();
            assert!(tm.wal_size().unwrap() < before);
        }

        let (tm, report) = recover(&log);
        assert_eq!(report.committed_seq, SequenceNumber::new(20));
        assert_eq!(tm.key_count(), 1);
        let mut read = tm.begin_read().unwrap();
        assert_eq!(read.get(b"counter").unwrap().as_deref(), Some(&b"9"[..]));
    }

    #[test]
    fn auto_checkpoint_bounds_wal() {
        let wal = WalManager::new(Box::new(MemoryLog::new()), true);
        let tm = TransactionManager::recover(wal, 512).unwrap().0;
        for n in 0..100 {
            let mut txn = tm.begin_write().unwrap();
            txn.put("k", n.to_string());
            txn.commit().unwrap();
        }
        assert!(tm.wal_size().unwrap() <= 512);
    }

    #[test]
    fn closed_manager_rejects_work() {
        let tm = manager();
        let mut txn = tm.begin_write().unwrap();
        txn.put("k", "v");
        tm.close().unwrap();
        assert!(matches!(txn.commit(), Err(CoreError::DatabaseClosed)));
        assert!(matches!(tm.begin_read(), Err(CoreError::DatabaseClosed)));
    }
}
