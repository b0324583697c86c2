use anyhow::{Context, Result};

use clipdex::config::ClipdexConfig;
use clipdex::db;

/// Display store statistics and a health report in the terminal.
pub fn stats(config: &ClipdexConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `clipdex serve` or `clipdex ingest` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Image Store");
    println!("{}", "=".repeat(40));
    println!("  Database:            {}", db_path.display());
    println!("  File size:           {}", format_bytes(file_size));
    println!("  Schema version:      {}", report.schema_version);
    println!("  Images:              {}", report.image_count);
    println!();

    println!("Embedding dimension:");
    match report.embedding_dim {
        Some(stored) => println!("  Stored:              {stored}"),
        None => println!("  Stored:              (not set)"),
    }
    println!("  Configured:          {}", config.embedding.dimensions);
    if let Some(stored) = report.embedding_dim {
        if stored != config.embedding.dimensions {
            println!("  WARNING: dimension mismatch! The store will refuse to open.");
        }
    }
    println!();

    if report.integrity_ok {
        println!("Integrity check:       PASSED");
    } else {
        println!("Integrity check:       FAILED");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
