//! In-memory log for tests and ephemeral databases.

use crate::error::{StorageError, StorageResult};
use crate::log::LogStore;
use parking_lot::{Mutex, RwLock};
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// An in-memory log.
///
/// Clones share the same buffer, which lets a test hand one clone to a
/// database, drop the database, and reopen a new one from another clone to
/// exercise recovery.
///
/// # Example
///
/// ```rust
/// use listenup_storage::{LogStore, MemoryLog};
///
/// let log = MemoryLog::new();
/// let reader = log.clone();
/// log.append(b"abc").unwrap();
/// assert_eq!(reader.size().unwrap(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    data: Arc<RwLock<Vec<u8>>>,
    failing_syncs: Arc<AtomicU32>,
    torn_append: Arc<Mutex<Option<usize>>>,
}

impl MemoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log holding pre-existing bytes.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            failing_syncs: Arc::default(),
            torn_append: Arc::default(),
        }
    }

    /// Returns a copy of the log content.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Removes the last `count` bytes, simulating a torn write.
    pub fn tear(&self, count: usize) {
        let mut data = self.data.write();
        let keep = data.len().saturating_sub(count);
        data.truncate(keep);
    }

    /// Makes the next `count` calls to [`LogStore::sync`] fail.
    pub fn fail_next_syncs(&self, count: u32) {
        self.failing_syncs.store(count, Ordering::SeqCst);
    }

    /// Makes the next [`LogStore::append`] write only its first `bytes`
    /// bytes and then fail, like a device that fills up mid-write.
    ///
    /// The partial bytes stay in the buffer; undoing them is the caller's job.
    pub fn fail_next_append_after(&self, bytes: usize) {
        *self.torn_append.lock() = Some(bytes);
    }
}

impl LogStore for MemoryLog {
    fn append(&self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        if let Some(written) = self.torn_append.lock().take() {
            data.extend_from_slice(&new_data[..written.min(new_data.len())]);
            let err = io::Error::new(io::ErrorKind::WriteZero, "injected append failure");
            return Err(err.into());
        }
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[start..end].to_vec())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&self) -> StorageResult<()> {
        let pending = self
            .failing_syncs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match pending {
            Ok(_) => Err(StorageError::SyncFailed("injected sync failure".into())),
            Err(_) => Ok(()),
        }
    }

    fn truncate(&self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::ReadPastEnd {
                offset: new_size,
                len: 0,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }

    fn replace(&self, new_data: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        data.clear();
        data.extend_from_slice(new_data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_offsets() {
        let log = MemoryLog::new();
        assert_eq!(log.append(b"hello").unwrap(), 0);
        assert_eq!(log.append(b" world").unwrap(), 5);
        assert_eq!(log.size().unwrap(), 11);
        assert_eq!(log.read_all().unwrap(), b"hello world");
    }

    #[test]
    fn read_past_end_fails() {
        let log = MemoryLog::new();
        log.append(b"hello").unwrap();

        assert!(matches!(
            log.read_at(3, 10),
            Err(StorageError::ReadPastEnd { .. })
        ));
        assert!(log.read_at(5, 0).unwrap().is_empty());
    }

    #[test]
    fn clones_share_content() {
        let log = MemoryLog::new();
        let other = log.clone();
        log.append(b"shared").unwrap();
        assert_eq!(other.snapshot(), b"shared");
    }

    #[test]
    fn replace_swaps_everything() {
        let log = MemoryLog::with_data(b"old content".to_vec());
        log.replace(b"new").unwrap();
        assert_eq!(log.read_all().unwrap(), b"new");
        assert_eq!(log.append(b"!").unwrap(), 3);
    }

    #[test]
    fn injected_sync_failures_are_consumed() {
        let log = MemoryLog::new();
        log.fail_next_syncs(2);
        assert!(log.sync().is_err());
        assert!(log.sync().is_err());
        assert!(log.sync().is_ok());
    }

    #[test]
    fn injected_append_failure_leaves_partial_bytes_once() {
        let log = MemoryLog::new();
        log.append(b"ok").unwrap();
        log.fail_next_append_after(3);
        assert!(matches!(log.append(b"partial"), Err(StorageError::Io(_))));
        assert_eq!(log.snapshot(), b"okpar");

        log.truncate(2).unwrap();
        assert_eq!(log.append(b"!").unwrap(), 2);
        assert_eq!(log.snapshot(), b"ok!");
    }

    #[test]
    fn tear_simulates_torn_write() {
        let log = MemoryLog::new();
        log.append(b"complete").unwrap();
        log.tear(4);
        assert_eq!(log.read_all().unwrap(), b"comp");
    }

    #[test]
    fn truncate_past_end_fails() {
        let log = MemoryLog::with_data(b"abc".to_vec());
        assert!(log.truncate(10).is_err());
        log.truncate(1).unwrap();
        assert_eq!(log.snapshot(), b"a");
    }

    proptest::proptest! {
        #[test]
        fn chunks_read_back_at_their_offsets(
            chunks in proptest::collection::vec(proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64), 1..16)
        ) {
            let log = MemoryLog::new();
            let offsets: Vec<u64> = chunks.iter().map(|c| log.append(c).unwrap()).collect();
            for (chunk, offset) in chunks.iter().zip(offsets) {
                proptest::prop_assert_eq!(&log.read_at(offset, chunk.len()).unwrap(), chunk);
            }
        }
    }
}
