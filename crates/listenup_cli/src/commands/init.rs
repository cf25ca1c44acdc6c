//! Init command implementation.

use listenup_core::retry::CancelToken;
use listenup_store::{Server, StoreConfig, StoreContext, StoreResult};
use std::path::Path;

/// Opens (or creates) the store at `path` and makes sure the server record
/// exists.
pub fn init(path: &Path, name: Option<String>) -> StoreResult<Server> {
    let mut config = StoreConfig::default();
    if let Some(name) = name {
        config = config.server_name(name);
    }
    let ctx = StoreContext::open(path, config)?;
    let server = ctx.bootstrap(&CancelToken::new())?;
    ctx.close()?;
    Ok(server)
}

/// Runs the init command.
pub fn run(path: &Path, name: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let server = init(path, name)?;
    println!("Store ready at {}", path.display());
    println!("  Server:  {}", server.config.name);
    println!("  Set up:  {}", if server.is_set_up { "yes" } else { "no" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_twice_keeps_first_server() {
        let dir = tempdir().unwrap();
        let first = init(dir.path(), Some("Home".to_string())).unwrap();
        let second = init(dir.path(), Some("Other".to_string())).unwrap();

        assert_eq!(second.config.name, "Home");
        assert_eq!(second.signing_secret, first.signing_secret);
    }
}
