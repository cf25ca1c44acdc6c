//! Checkpoint command implementation.

use super::open_existing;
use std::path::Path;

/// Runs the checkpoint command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = open_existing(path)?;
    let before = ctx.database().stats()?.wal_size;
    ctx.database().checkpoint()?;
    let after = ctx.database().stats()?.wal_size;
    ctx.close()?;

    println!("WAL compacted: {before} -> {after} bytes");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init::init;
    use listenup_core::retry::CancelToken;
    use listenup_store::{Library, StoreConfig, StoreContext};
    use tempfile::tempdir;

    #[test]
    fn checkpoint_keeps_data() {
        let dir = tempdir().unwrap();
        init(dir.path(), None).unwrap();
        {
            let ctx = StoreContext::open(dir.path(), StoreConfig::default()).unwrap();
            let cancel = CancelToken::new();
            let library = Library::new("Books");
            ctx.libraries().create_library(&cancel, &library).unwrap();
            ctx.libraries().create_library(&cancel, &Library::new("Podcasts")).unwrap();
            ctx.close().unwrap();
        }

        run(dir.path()).unwrap();

        let ctx = open_existing(dir.path()).unwrap();
        assert_eq!(ctx.libraries().get_all_libraries().unwrap().len(), 2);
        assert!(ctx.servers().get_server().unwrap().is_some());
    }
}
