//! Status command implementation.

use super::open_existing;
use serde::Serialize;
use std::path::Path;

/// Store status.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Database path.
    pub path: String,
    /// Server name, if the server record exists.
    pub server_name: Option<String>,
    /// Whether the first user has registered.
    pub is_set_up: bool,
    /// Number of live keys.
    pub key_count: usize,
    /// Latest committed sequence number.
    pub committed_seq: u64,
    /// WAL size in bytes.
    pub wal_size: u64,
    /// Number of libraries.
    pub library_count: usize,
}

/// Collects the status of the store at `path`.
pub fn collect(path: &Path) -> Result<StatusResult, Box<dyn std::error::Error>> {
    let ctx = open_existing(path)?;
    let server = ctx.servers().get_server()?;
    let library_count = ctx.libraries().get_all_libraries()?.len();
    let stats = ctx.database().stats()?;
    ctx.close()?;

    Ok(StatusResult {
        path: path.display().to_string(),
        server_name: server.as_ref().map(|s| s.config.name.clone()),
        is_set_up: server.is_some_and(|s| s.is_set_up),
        key_count: stats.key_count,
        committed_seq: stats.committed_seq.as_u64(),
        wal_size: stats.wal_size,
        library_count,
    })
}

/// Runs the status command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(path)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &StatusResult) {
    println!("Store: {}", result.path);
    println!();
    match &result.server_name {
        Some(name) => {
            println!("Server:");
            println!("  Name:      {name}");
            println!("  Set up:    {}", if result.is_set_up { "yes" } else { "no" });
        }
        None => println!("Server: not created (run `listenup init`)"),
    }
    println!();
    println!("Engine:");
    println!("  Keys:      {}", result.key_count);
    println!("  Sequence:  {}", result.committed_seq);
    println!("  WAL size:  {}", format_bytes(result.wal_size));
    println!("  Libraries: {}", result.library_count);
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
