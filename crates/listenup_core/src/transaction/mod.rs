//! Transactions over the shared keyspace.
//!
//! - **Read transactions** see a fixed snapshot and never block writers.
//! - **Write transactions** buffer their writes, read their own writes, and
//!   are validated at commit: if any key they read or wrote, or any key
//!   inside a prefix they scanned, was committed by someone else after their
//!   snapshot, the commit fails with [`CoreError::Conflict`].
//!
//! Validating scanned prefixes makes check-then-act patterns ("scan for a
//! colliding index entry, then insert") serializable, not merely
//! snapshot-isolated.
//!
//! [`CoreError::Conflict`]: crate::CoreError::Conflict

mod manager;
mod read;
mod write;

pub(crate) use manager::TransactionManager;
pub use read::{ReadOps, ReadTxn};
pub use write::WriteTxn;
