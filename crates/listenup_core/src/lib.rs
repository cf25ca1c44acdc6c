//! # ListenUp Core
//!
//! Embedded transactional key-value engine for the ListenUp persistence
//! core.
//!
//! This crate provides:
//! - An ordered, multi-version keyspace with prefix scans
//! - Snapshot-isolated read transactions ([`Database::view`])
//! - Serializable write transactions validated at commit
//!   ([`Database::update`]), including phantom protection for scanned
//!   prefixes
//! - A write-ahead log for durability, crash recovery and checkpoints
//! - The [`retry`] module: a bounded conflict-retry executor with backoff,
//!   jitter and cancellation
//!
//! ## Errors
//!
//! Engine failures are classified structurally through
//! [`CoreError::kind`]: [`EngineErrorKind::Conflict`] is the only failure a
//! caller should retry.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod dir;
mod error;
mod mvcc;
pub mod retry;
mod transaction;
mod types;
pub mod wal;

pub use config::{Config, DEFAULT_MAX_WAL_SIZE};
pub use database::{Database, DatabaseStats};
pub use error::{CoreError, CoreResult, EngineErrorKind};
pub use transaction::{ReadOps, ReadTxn, WriteTxn};
pub use types::{SequenceNumber, TransactionId};
