//! Versioned binary record envelope.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Magic bytes at the start of every record.
pub const RECORD_MAGIC: [u8; 2] = *b"LU";

/// Current record format version.
pub const RECORD_VERSION: u8 = 1;

const HEADER_SIZE: usize = 4;

/// Entity kind stored in a record header.
///
/// Decoding checks the kind so a value written under one prefix can never be
/// silently read back as a different entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    /// The server singleton.
    Server = 1,
    /// A user record.
    User = 2,
    /// A refresh token record.
    RefreshToken = 3,
    /// A library record.
    Library = 4,
    /// An email index entry.
    EmailIndex = 5,
}

impl RecordKind {
    /// Converts a header byte to a record kind.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Server),
            2 => Some(Self::User),
            3 => Some(Self::RefreshToken),
            4 => Some(Self::Library),
            5 => Some(Self::EmailIndex),
            _ => None,
        }
    }

    /// Converts the record kind to its header byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Serializes `value` into a record of the given kind.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if serde rejects the value.
pub fn encode_record<T: Serialize>(kind: RecordKind, value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(&RECORD_MAGIC);
    buf.push(RECORD_VERSION);
    buf.push(kind.as_byte());
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Deserializes a record, checking the envelope first.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the header is wrong, the kind differs
/// from `expected`, or the payload does not decode as `T`.
pub fn decode_record<T: DeserializeOwned>(expected: RecordKind, bytes: &[u8]) -> CodecResult<T> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::malformed(format!(
            "record too short: {} bytes",
            bytes.len()
        )));
    }
    if bytes[0..2] != RECORD_MAGIC {
        return Err(CodecError::malformed("invalid magic"));
    }

    let version = bytes[2];
    if version == 0 || version > RECORD_VERSION {
        return Err(CodecError::malformed(format!(
            "unsupported record version {version}"
        )));
    }

    let kind = RecordKind::from_byte(bytes[3])
        .ok_or_else(|| CodecError::malformed(format!("unknown record kind {}", bytes[3])))?;
    if kind != expected {
        return Err(CodecError::malformed(format!(
            "expected {expected:?} record, found {kind:?}"
        )));
    }

    let mut payload = &bytes[HEADER_SIZE..];
    let value = ciborium::from_reader(&mut payload).map_err(|e| CodecError::malformed(e.to_string()))?;
    if !payload.is_empty() {
        return Err(CodecError::malformed(format!(
            "{} trailing bytes after record payload",
            payload.len()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: String,
        tags: Vec<String>,
        count: u32,
        seen: Option<u64>,
    }

    fn sample() -> Sample {
        Sample {
            id: "s1".into(),
            tags: vec!["a".into(), "b".into()],
            count: 7,
            seen: None,
        }
    }

    #[test]
    fn header_layout() {
        let bytes = encode_record(RecordKind::User, &sample()).unwrap();
        assert_eq!(&bytes[0..2], b"LU");
        assert_eq!(bytes[2], RECORD_VERSION);
        assert_eq!(bytes[3], RecordKind::User.as_byte());
    }

    #[test]
    fn kind_mismatch_is_malformed() {
        let bytes = encode_record(RecordKind::User, &sample()).unwrap();
        let err = decode_record::<Sample>(RecordKind::Library, &bytes).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn garbage_is_malformed() {
        let cases: [&[u8]; 5] = [b"", b"LU", b"XX\x01\x02\xa0", b"LU\x09\x02\xa0", b"LU\x01\x63"];
        for bytes in cases {
            assert!(matches!(
                decode_record::<Sample>(RecordKind::User, bytes),
                Err(CodecError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let bytes = encode_record(RecordKind::User, &sample()).unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(decode_record::<Sample>(RecordKind::User, cut).is_err());
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let mut bytes = encode_record(RecordKind::User, &sample()).unwrap();
        bytes.extend_from_slice(&[0xf6, 0x00]);
        let err = decode_record::<Sample>(RecordKind::User, &bytes).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    proptest! {
        #[test]
        fn records_round_trip(
            id in "[a-zA-Z0-9_-]{1,16}",
            tags in prop::collection::vec("[a-z]{0,8}", 0..6),
            count in any::<u32>(),
            seen in any::<Option<u64>>(),
        ) {
            let value = Sample { id, tags, count, seen };
            let bytes = encode_record(RecordKind::Library, &value).unwrap();
            let back: Sample = decode_record(RecordKind::Library, &bytes).unwrap();
            prop_assert_eq!(back, value);
        }
    }
}
