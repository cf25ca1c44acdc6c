//! Token sweep command implementation.

use super::open_existing;
use listenup_core::retry::CancelToken;
use std::path::Path;
use std::time::Duration;

/// Default maximum token age: 30 days.
pub const DEFAULT_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Runs the sweep-tokens command.
pub fn run(path: &Path, max_age_secs: u64) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = open_existing(path)?;
    let deleted = ctx
        .auth()
        .cleanup_expired_tokens(&CancelToken::new(), Duration::from_secs(max_age_secs))?;
    ctx.close()?;

    println!("Deleted {deleted} expired refresh token(s)");
    Ok(())
}
