//! # ListenUp Codec
//!
//! Key construction and binary record encoding for the ListenUp
//! persistence core.
//!
//! ## Keys
//!
//! Every entity kind owns one lexical prefix, so a prefix scan enumerates
//! exactly one kind:
//!
//! | Kind | Key |
//! |------|-----|
//! | Server | `server` |
//! | User | `user:<id>` |
//! | Email index | `email:<lower(email)>\0<id>` |
//! | Refresh token | `refresh_token:<user_id>` |
//! | Library | `library:<id>` |
//!
//! ## Records
//!
//! ```text
//! | magic "LU" (2) | version (1) | kind (1) | CBOR payload (N) |
//! ```
//!
//! ## Usage
//!
//! ```
//! use listenup_codec::{decode_record, encode_record, keys, RecordKind};
//!
//! let key = keys::library("L1");
//! assert_eq!(key, b"library:L1");
//!
//! let bytes = encode_record(RecordKind::Library, &"payload".to_string()).unwrap();
//! let back: String = decode_record(RecordKind::Library, &bytes).unwrap();
//! assert_eq!(back, "payload");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod keys;
mod record;

pub use error::{CodecError, CodecResult};
pub use record::{decode_record, encode_record, RecordKind, RECORD_MAGIC, RECORD_VERSION};
