//! Libraries command implementation.

use super::open_existing;
use listenup_store::Library;
use std::path::Path;

/// Runs the libraries command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = open_existing(path)?;
    let libraries = ctx.libraries().get_all_libraries()?;
    ctx.close()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&libraries)?),
        _ => print_text_output(&libraries),
    }
    Ok(())
}

fn print_text_output(libraries: &[Library]) {
    if libraries.is_empty() {
        println!("No libraries");
        return;
    }
    for library in libraries {
        println!("{} ({})", library.name, library.id);
        for dir in &library.directories {
            println!("  {:<20} {} [{} books]", dir.name, dir.path, dir.book_count);
        }
    }
}
