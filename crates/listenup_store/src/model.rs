//! Persisted entity types.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of a generated signing secret in bytes.
pub const SIGNING_SECRET_LEN: usize = 32;

/// Generates a new primary identifier.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Current time in Unix milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Server-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Display name of the server.
    pub name: String,
}

/// The server singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Flips to true once, on first user registration.
    pub is_set_up: bool,
    /// Server-wide settings.
    pub config: ServerConfig,
    /// Key material for token signing; never changes after creation.
    pub signing_secret: Vec<u8>,
}

impl Server {
    /// A fresh, not yet set up server with a random signing secret.
    #[must_use]
    pub fn generate(name: impl Into<String>) -> Self {
        let mut secret = vec![0u8; SIGNING_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        Self {
            is_set_up: false,
            config: ServerConfig { name: name.into() },
            signing_secret: secret,
        }
    }
}

/// A user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full control of the server.
    Admin,
    /// Regular listener.
    Member,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Primary identifier.
    pub id: String,
    /// Login email; unique regardless of case.
    pub email: String,
    /// Name shown in clients.
    pub display_name: String,
    /// Password hash, produced by the authentication layer.
    pub hashed_password: String,
    /// Role.
    pub role: Role,
    /// Library the user last selected.
    pub current_library_id: Option<String>,
    /// Libraries the user can access, in order.
    pub library_ids: Vec<String>,
    /// Creation time (Unix ms).
    pub created_at: u64,
    /// Last successful login (Unix ms).
    pub last_login: Option<u64>,
}

impl User {
    /// A new user with a generated id, created now.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        display_name: impl Into<String>,
        hashed_password: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: new_id(),
            email: email.into(),
            display_name: display_name.into(),
            hashed_password: hashed_password.into(),
            role,
            current_library_id: None,
            library_ids: Vec::new(),
            created_at: now_millis(),
            last_login: None,
        }
    }
}

/// The refresh token held for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Owning user.
    pub user_id: String,
    /// Opaque token.
    pub token: String,
    /// Issue time (Unix ms).
    pub created_at: u64,
}

/// A scanned media directory inside a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Filesystem path.
    pub path: String,
    /// Books found at the last scan.
    pub book_count: u32,
}

impl Directory {
    /// A new, empty directory entry with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            path: path.into(),
            book_count: 0,
        }
    }
}

/// A library and its directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Primary identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Directories, in the order they were added.
    pub directories: Vec<Directory>,
    /// Creation time (Unix ms).
    pub created_at: u64,
}

impl Library {
    /// A new library without directories, created now.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            directories: Vec::new(),
            created_at: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_simple() {
        let a = new_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, new_id());
    }

    #[test]
    fn generated_servers_have_distinct_secrets() {
        let a = Server::generate("home");
        let b = Server::generate("home");
        assert!(!a.is_set_up);
        assert_eq!(a.signing_secret.len(), SIGNING_SECRET_LEN);
        assert_ne!(a.signing_secret, b.signing_secret);
    }

    #[test]
    fn new_user_defaults() {
        let user = User::new("ann@example.com", "Ann", "hash", Role::Member);
        assert!(user.last_login.is_none());
        assert!(user.library_ids.is_empty());
        assert!(user.created_at > 0);
    }
}
