//! # ListenUp Store
//!
//! Entity stores for the ListenUp persistence core: the server singleton,
//! users with a unique email index, refresh tokens, and libraries.
//!
//! Each store owns one key prefix and borrows the shared
//! [`StoreContext`]. Mutations run inside a single write transaction under
//! the context's retry executor; a commit conflict replays the whole
//! operation against fresh state. Business-rule failures (`NotFound`,
//! `AlreadyExists`, `Invalid`) are permanent and never retried.
//!
//! ## Example
//!
//! ```rust
//! use listenup_core::retry::CancelToken;
//! use listenup_store::{Directory, Library, StoreConfig, StoreContext};
//!
//! let ctx = StoreContext::in_memory(StoreConfig::default()).unwrap();
//! let cancel = CancelToken::new();
//!
//! let server = ctx.bootstrap(&cancel).unwrap();
//! assert!(!server.is_set_up);
//!
//! let library = Library::new("Audiobooks");
//! ctx.libraries().create_library(&cancel, &library).unwrap();
//! let library = ctx
//!     .libraries()
//!     .add_directory(&cancel, &library.id, &Directory::new("Books", "/books"))
//!     .unwrap();
//! assert_eq!(library.directories.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod auth;
mod context;
mod error;
mod library;
mod model;
mod server;
mod user;

pub use auth::AuthStore;
pub use context::{StoreConfig, StoreContext, DEFAULT_SERVER_NAME};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use library::LibraryStore;
pub use model::{
    new_id, now_millis, Directory, Library, RefreshToken, Role, Server, ServerConfig, User,
    SIGNING_SECRET_LEN,
};
pub use server::ServerStore;
pub use user::UserStore;
