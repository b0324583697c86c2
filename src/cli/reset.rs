//! CLI `reset` command: delete every stored image after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use clipdex::config::ClipdexConfig;

/// Delete all images (records and uploaded files) after user confirmation.
pub fn reset(config: &ClipdexConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let upload_dir = config.resolved_upload_dir();

    println!("WARNING: This will permanently delete ALL stored images and embeddings.");
    println!("Database: {}", db_path.display());
    println!("Uploads:  {}", upload_dir.display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    let store = super::open_store(config)?;
    let removed = store.clear()?;

    let mut files = 0usize;
    if upload_dir.is_dir() {
        for entry in std::fs::read_dir(&upload_dir)? {
            let path = entry?.path();
            if path.is_file() {
                std::fs::remove_file(&path)?;
                files += 1;
            }
        }
    }

    println!("Deleted {removed} image record(s) and {files} uploaded file(s).");
    Ok(())
}
