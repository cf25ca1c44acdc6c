//! Log store trait definition.

use crate::error::StorageResult;

/// An append-only byte log.
///
/// All methods take `&self`: implementations serialize access internally so
/// a single log can be shared by the engine's commit path and its readers.
///
/// # Invariants
///
/// - `append` returns the offset where the bytes begin
/// - `read_at` returns exactly the bytes previously appended at that offset
/// - after `sync` returns, every appended byte survives process termination
/// - `replace` is all-or-nothing: a crash leaves either the old or the new
///   content, never a mix
pub trait LogStore: Send + Sync {
    /// Appends `data` to the end of the log and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&self, data: &[u8]) -> StorageResult<u64>;

    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range extends past
    /// the end of the log.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Reads the complete log content.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| crate::StorageError::ReadPastEnd {
            offset: 0,
            len: usize::MAX,
            size,
        })?;
        self.read_at(0, len)
    }

    /// Returns the current size of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Makes all appended data durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the data could not be made durable.
    fn sync(&self) -> StorageResult<()>;

    /// Discards every byte after `new_size`.
    ///
    /// Used by recovery to cut off a torn tail so later appends start at a
    /// record boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` is larger than the log or the
    /// truncation fails.
    fn truncate(&self, new_size: u64) -> StorageResult<()>;

    /// Atomically replaces the entire log content with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement could not be completed. The
    /// previous content is intact in that case.
    fn replace(&self, data: &[u8]) -> StorageResult<()>;
}
