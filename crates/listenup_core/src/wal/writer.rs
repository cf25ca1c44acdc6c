//! WAL writer and recovery reader.

use crate::error::CoreResult;
use crate::wal::iterator::WalRecordIterator;
use crate::wal::record::{WalRecord, WalRecordType};
use listenup_storage::LogStore;
use tracing::{debug, warn};

/// Result of reading the WAL back at open time.
#[derive(Debug, Default)]
pub struct WalContents {
    /// Every complete record, in log order.
    pub records: Vec<WalRecord>,
    /// Offset just past the last `Commit` record.
    pub committed_len: u64,
    /// Offset just past the last complete record.
    pub valid_len: u64,
    /// Bytes found after `valid_len` (a torn tail).
    pub torn_bytes: u64,
}

/// Appends commit batches to a log and reads them back for recovery.
pub struct WalManager {
    log: Box<dyn LogStore>,
    sync_on_commit: bool,
}

impl WalManager {
    /// Creates a WAL over `log`.
    pub fn new(log: Box<dyn LogStore>, sync_on_commit: bool) -> Self {
        Self {
            log,
            sync_on_commit,
        }
    }

    /// Appends `records` as one contiguous write and makes them durable.
    ///
    /// If the append or the sync fails, whatever part of the batch reached
    /// the log is cut off again. An unacknowledged commit can then never be
    /// replayed, and the next batch starts on a clean record boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding, appending or syncing fails.
    pub fn append_batch(&self, records: &[WalRecord]) -> CoreResult<u64> {
        let mut data = Vec::new();
        for record in records {
            data.extend_from_slice(&record.encode()?);
        }

        let start = self.log.size()?;
        let appended = self.log.append(&data);
        let synced = match appended {
            Ok(_) if self.sync_on_commit => self.log.sync(),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = synced {
            self.cut_back(start);
            return Err(e.into());
        }
        Ok(start)
    }

    fn cut_back(&self, start: u64) {
        let Ok(size) = self.log.size() else { return };
        if size > start {
            if let Err(undo) = self.log.truncate(start) {
                warn!(start, error = %undo, "failed to cut failed WAL batch");
            }
        }
    }

    /// Reads every complete record.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or on corruption other than a torn
    /// tail.
    pub fn read_all(&self) -> CoreResult<WalContents> {
        let data = self.log.read_all()?;
        let mut iter = WalRecordIterator::new(&data);
        let mut records = Vec::new();
        let mut committed_len = 0;

        while let Some(item) = iter.next() {
            let (_, record) = item?;
            if record.record_type() == WalRecordType::Commit {
                committed_len = iter.position();
            }
            records.push(record);
        }

        let valid_len = iter.position();
        let torn_bytes = data.len() as u64 - valid_len;

        debug!(records = records.len(), committed_len, valid_len, "read WAL");
        Ok(WalContents {
            records,
            committed_len,
            valid_len,
            torn_bytes,
        })
    }

    /// Discards everything after `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be truncated.
    pub fn truncate(&self, offset: u64) -> CoreResult<()> {
        self.log.truncate(offset)?;
        Ok(())
    }

    /// Atomically replaces the WAL with `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the replacement fails; the previous
    /// WAL is intact in that case.
    pub fn replace(&self, records: &[WalRecord]) -> CoreResult<()> {
        let mut data = Vec::new();
        for record in records {
            data.extend_from_slice(&record.encode()?);
        }
        self.log.replace(&data)?;
        Ok(())
    }

    /// Makes all appended records durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&self) -> CoreResult<()> {
        self.log.sync()?;
        Ok(())
    }

    /// Returns the current WAL size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.log.size()?)
    }
}

impl std::fmt::Debug for WalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalManager")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}
