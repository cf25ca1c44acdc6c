//! Ordered multi-version keyspace.

use crate::types::SequenceNumber;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::Bound;

/// One committed version of a key. `None` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Version {
    pub(crate) seq: SequenceNumber,
    pub(crate) value: Option<Bytes>,
}

/// Every key with its committed versions, oldest first.
#[derive(Debug, Default)]
pub(crate) struct Keyspace {
    entries: BTreeMap<Vec<u8>, Vec<Version>>,
}

impl Keyspace {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn prefix_range<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Vec<Version>)> + 'a {
        self.entries
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
    }

    fn visible(chain: &[Version], snapshot: SequenceNumber) -> Option<&Bytes> {
        chain
            .iter()
            .rev()
            .find(|v| v.seq <= snapshot)
            .and_then(|v| v.value.as_ref())
    }

    /// Value of `key` as of `snapshot`.
    pub(crate) fn get_at(&self, key: &[u8], snapshot: SequenceNumber) -> Option<Bytes> {
        self.entries
            .get(key)
            .and_then(|chain| Self::visible(chain, snapshot))
            .cloned()
    }

    /// Live entries under `prefix` as of `snapshot`, in key order.
    pub(crate) fn scan_at(
        &self,
        prefix: &[u8],
        snapshot: SequenceNumber,
        limit: Option<usize>,
    ) -> Vec<(Vec<u8>, Bytes)> {
        self.prefix_range(prefix)
            .filter_map(|(key, chain)| {
                Self::visible(chain, snapshot).map(|value| (key.clone(), value.clone()))
            })
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Sequence number of the newest version of `key`, tombstones included.
    pub(crate) fn latest_seq(&self, key: &[u8]) -> Option<SequenceNumber> {
        self.entries
            .get(key)
            .and_then(|chain| chain.last())
            .map(|v| v.seq)
    }

    /// First key under `prefix` with a version newer than `snapshot`.
    pub(crate) fn changed_in_prefix_since(
        &self,
        prefix: &[u8],
        snapshot: SequenceNumber,
    ) -> Option<Vec<u8>> {
        self.prefix_range(prefix)
            .find(|(_, chain)| chain.last().is_some_and(|v| v.seq > snapshot))
            .map(|(key, _)| key.clone())
    }

    /// Appends a committed version.
    pub(crate) fn apply(&mut self, key: Vec<u8>, value: Option<Bytes>, seq: SequenceNumber) {
        self.entries
            .entry(key)
            .or_default()
            .push(Version { seq, value });
    }

    /// Drops versions of `key` that no snapshot at or after `oldest` can see.
    ///
    /// The newest version at or before `oldest` is kept, along with every
    /// later one. A key whose only remaining version is a tombstone is
    /// removed entirely.
    pub(crate) fn prune(&mut self, key: &[u8], oldest: SequenceNumber) {
        let Some(chain) = self.entries.get_mut(key) else {
            return;
        };

        let keep_from = chain
            .iter()
            .rposition(|v| v.seq <= oldest)
            .unwrap_or(0);
        chain.drain(..keep_from);

        if chain.len() == 1 && chain[0].value.is_none() && chain[0].seq <= oldest {
            self.entries.remove(key);
        }
    }

    /// Prunes every key against `oldest`.
    pub(crate) fn prune_all(&mut self, oldest: SequenceNumber) {
        let keys: Vec<Vec<u8>> = self
            .entries
            .iter()
            .filter(|(_, chain)| chain.len() > 1 || chain.first().is_some_and(|v| v.value.is_none()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            self.prune(&key, oldest);
        }
    }

    /// Newest live value of every key, in key order.
    pub(crate) fn live_entries(&self) -> impl Iterator<Item = (&[u8], &Bytes)> {
        self.entries.iter().filter_map(|(key, chain)| {
            chain
                .last()
                .and_then(|v| v.value.as_ref())
                .map(|value| (key.as_slice(), value))
        })
    }

    /// Number of keys with a live newest version.
    pub(crate) fn live_count(&self) -> usize {
        self.live_entries().count()
    }

    #[cfg(test)]
    pub(crate) fn versions(&self, key: &[u8]) -> usize {
        self.entries.get(key).map_or(0, Vec::len)
    }
}
