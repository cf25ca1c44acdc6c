//! Multi-version state shared by all transactions.
//!
//! Every committed write becomes a new version of its key, tagged with the
//! commit's sequence number. A snapshot at sequence `s` sees, for each key,
//! the newest version with a sequence at or below `s`.

mod keyspace;
mod snapshots;

pub(crate) use keyspace::Keyspace;
pub(crate) use snapshots::{SnapshotGuard, SnapshotRegistry};
