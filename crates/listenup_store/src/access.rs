//! Record access shared by the stores.

use crate::error::{StoreError, StoreResult};
use listenup_codec::{decode_record, encode_record, RecordKind};
use listenup_core::ReadOps;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads and decodes the record at `key`.
pub(crate) fn load<T, R>(
    txn: &mut R,
    key: &[u8],
    kind: RecordKind,
    entity: &'static str,
) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadOps + ?Sized,
{
    match txn.get(key)? {
        Some(bytes) => decode_record(kind, &bytes)
            .map(Some)
            .map_err(|e| StoreError::malformed(entity, e)),
        None => Ok(None),
    }
}

/// Encodes `value` as a record of `kind`.
pub(crate) fn encode<T: Serialize>(
    kind: RecordKind,
    value: &T,
    entity: &'static str,
) -> StoreResult<Vec<u8>> {
    encode_record(kind, value).map_err(|e| StoreError::malformed(entity, e))
}
