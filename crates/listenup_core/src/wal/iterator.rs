//! WAL record iterator.

use crate::error::{CoreError, CoreResult};
use crate::wal::record::{WalRecord, WalRecordType, CRC_SIZE, HEADER_SIZE, WAL_MAGIC, WAL_VERSION};

/// Iterator over the records of a WAL image.
///
/// Yields `(offset, record)` pairs. A record cut short by a crash (incomplete
/// header or payload at the very end) ends iteration cleanly; anything else
/// that fails validation is returned as an error and ends iteration.
pub struct WalRecordIterator<'a> {
    data: &'a [u8],
    offset: usize,
    finished: bool,
}

impl<'a> WalRecordIterator<'a> {
    /// Creates an iterator over a complete WAL image.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            finished: false,
        }
    }

    /// Offset just past the last record returned.
    ///
    /// After iteration ends cleanly, everything beyond this point is a torn
    /// tail.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset as u64
    }

    fn read_next(&mut self) -> CoreResult<Option<(u64, WalRecord)>> {
        let start = self.offset;
        let remaining = &self.data[start..];

        if remaining.len() < HEADER_SIZE {
            return Ok(None);
        }

        let header = &remaining[..HEADER_SIZE];
        if header[0..4] != WAL_MAGIC {
            return Err(CoreError::wal_corruption(format!(
                "invalid magic at offset {start}"
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version == 0 || version > WAL_VERSION {
            return Err(CoreError::wal_corruption(format!(
                "unsupported version {version} at offset {start}"
            )));
        }

        let type_byte = header[6];
        let record_type = WalRecordType::from_byte(type_byte).ok_or_else(|| {
            CoreError::wal_corruption(format!(
                "unknown record type {type_byte} at offset {start}"
            ))
        })?;

        let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;
        let total = HEADER_SIZE + len + CRC_SIZE;
        if remaining.len() < total {
            return Ok(None);
        }

        let body = &remaining[..HEADER_SIZE + len];
        let stored = u32::from_le_bytes([
            remaining[HEADER_SIZE + len],
            remaining[HEADER_SIZE + len + 1],
            remaining[HEADER_SIZE + len + 2],
            remaining[HEADER_SIZE + len + 3],
        ]);
        let computed = crc32fast::hash(body);
        if stored != computed {
            return Err(CoreError::ChecksumMismatch {
                offset: start as u64,
                expected: stored,
                actual: computed,
            });
        }

        let record = WalRecord::decode_payload(record_type, &body[HEADER_SIZE..])?;
        self.offset = start + total;
        Ok(Some((start as u64, record)))
    }
}

impl Iterator for WalRecordIterator<'_> {
    type Item = CoreResult<(u64, WalRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
