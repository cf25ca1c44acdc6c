//! CLI command implementations.

pub mod checkpoint;
pub mod init;
pub mod libraries;
pub mod status;
pub mod sweep;

use listenup_core::Config;
use listenup_store::{StoreConfig, StoreContext, StoreResult};
use std::path::Path;

/// Opens an existing store; only `init` may create one.
pub(crate) fn open_existing(path: &Path) -> StoreResult<StoreContext> {
    let config = StoreConfig::default().engine(Config::default().create_if_missing(false));
    StoreContext::open(path, config)
}
