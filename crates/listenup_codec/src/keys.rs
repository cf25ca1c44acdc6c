//! Key construction.
//!
//! Keys are raw bytes so the engine can order and prefix-scan them without
//! interpreting them. Identifiers are opaque strings chosen by callers.

/// Fixed key of the server singleton.
pub const SERVER_KEY: &[u8] = b"server";

/// Prefix of primary user records.
pub const USER_PREFIX: &[u8] = b"user:";

/// Prefix of the email secondary index.
pub const EMAIL_PREFIX: &[u8] = b"email:";

/// Prefix of refresh token records.
pub const REFRESH_TOKEN_PREFIX: &[u8] = b"refresh_token:";

/// Prefix of library records.
pub const LIBRARY_PREFIX: &[u8] = b"library:";

/// Separator between the normalized email and the user id in index keys.
///
/// A NUL byte never occurs in an email address, so the prefix for one email
/// cannot match the entries of a longer email that starts with it.
pub const INDEX_SEPARATOR: u8 = 0x00;

fn prefixed(prefix: &[u8], id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + id.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Returns the key of the server singleton.
#[must_use]
pub fn server() -> Vec<u8> {
    SERVER_KEY.to_vec()
}

/// Builds a primary user key.
///
/// # Example
/// ```
/// assert_eq!(listenup_codec::keys::user("u1"), b"user:u1");
/// ```
#[must_use]
pub fn user(id: &str) -> Vec<u8> {
    prefixed(USER_PREFIX, id)
}

/// Normalizes an email for the uniqueness index.
///
/// Comparison is case-insensitive; nothing else is rewritten.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

/// Builds the index prefix under which every entry for `email` lives.
///
/// # Example
/// ```
/// use listenup_codec::keys;
/// assert_eq!(keys::email_index_prefix("Ann@Example.com"), b"email:ann@example.com\0");
/// ```
#[must_use]
pub fn email_index_prefix(email: &str) -> Vec<u8> {
    let mut key = prefixed(EMAIL_PREFIX, &normalize_email(email));
    key.push(INDEX_SEPARATOR);
    key
}

/// Builds the full index entry mapping `email` to `user_id`.
#[must_use]
pub fn email_index(email: &str, user_id: &str) -> Vec<u8> {
    let mut key = email_index_prefix(email);
    key.extend_from_slice(user_id.as_bytes());
    key
}

/// Extracts the user id from an index entry found under `prefix`.
///
/// Returns `None` if `key` does not start with `prefix` or the remainder is
/// not UTF-8.
#[must_use]
pub fn id_from_email_index(key: &[u8], prefix: &[u8]) -> Option<String> {
    let rest = key.strip_prefix(prefix)?;
    std::str::from_utf8(rest).ok().map(str::to_owned)
}

/// Builds the refresh token key for a user.
#[must_use]
pub fn refresh_token(user_id: &str) -> Vec<u8> {
    prefixed(REFRESH_TOKEN_PREFIX, user_id)
}

/// Builds a library key.
#[must_use]
pub fn library(id: &str) -> Vec<u8> {
    prefixed(LIBRARY_PREFIX, id)
}

/// Renders a key for logs and error messages.
#[must_use]
pub fn display(key: &[u8]) -> String {
    String::from_utf8_lossy(key).replace('\0', "\\0")
}
