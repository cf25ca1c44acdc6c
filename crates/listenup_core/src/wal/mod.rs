//! Write-Ahead Log (WAL) for durability and crash recovery.
//!
//! The WAL is the only data file. Each commit appends one batch (its `Put`
//! and `Delete` records followed by a `Commit` record) and is acknowledged
//! only after the batch is synced. On open, committed batches are replayed
//! into the in-memory keyspace.
//!
//! ## WAL Record Format
//!
//! ```text
//! | magic "LUWL" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! ## Recovery Policy
//!
//! - A truncated header or payload at the end of the log is a crash during
//!   append: it is dropped, and the log is cut back to the last commit.
//! - A checksum mismatch, bad magic, unknown type or unsupported version is
//!   corruption: the database refuses to open.
//!
//! ## Checkpoints
//!
//! A checkpoint replaces the whole log with a single committed batch holding
//! the live keyspace, so the log stays proportional to the data.

mod iterator;
mod record;
mod writer;

pub use iterator::WalRecordIterator;
pub use record::{WalRecord, WalRecordType, WAL_MAGIC, WAL_VERSION};
pub use writer::{WalContents, WalManager};
