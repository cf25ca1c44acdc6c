//! # ListenUp Testkit
//!
//! Test utilities for the ListenUp persistence core.
//!
//! This crate provides:
//! - Store fixtures over in-memory and temporary on-disk databases
//! - Property-based generators for entities using proptest
//! - A thread-based runner for concurrency scenarios
//!
//! ## Usage
//!
//! ```rust
//! use listenup_testkit::prelude::*;
//! use listenup_store::Library;
//!
//! let ctx = TestContext::memory();
//! let library = Library::new("Audiobooks");
//! ctx.libraries().create_library(&ctx.cancel(), &library).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod concurrent;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::concurrent::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use concurrent::*;
pub use fixtures::*;
pub use generators::*;
