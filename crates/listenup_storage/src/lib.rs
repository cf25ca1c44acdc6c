//! # ListenUp Storage
//!
//! Append-only log storage for the ListenUp persistence core.
//!
//! A log store is an **opaque byte sequence** that only grows, except for
//! [`LogStore::replace`], which swaps the whole content in one step. The
//! engine's write-ahead log is the only thing written through this crate;
//! stores know nothing about records, keys or transactions.
//!
//! ## Available Logs
//!
//! - [`MemoryLog`] - For tests and ephemeral databases
//! - [`FileLog`] - For persistent storage, with rename-based replacement
//!
//! ## Example
//!
//! ```rust
//! use listenup_storage::{LogStore, MemoryLog};
//!
//! let log = MemoryLog::new();
//! let offset = log.append(b"hello").unwrap();
//! assert_eq!(log.read_at(offset, 5).unwrap(), b"hello");
//!
//! log.replace(b"compacted").unwrap();
//! assert_eq!(log.read_all().unwrap(), b"compacted");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod log;
mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileLog;
pub use log::LogStore;
pub use memory::MemoryLog;
