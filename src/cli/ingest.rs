//! CLI `ingest` command: embed and store image files in bulk.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clipdex::config::ClipdexConfig;

/// File extensions picked up when walking a directory.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Copy each image into the upload directory, embed it, and store it.
/// Directories are walked recursively.
pub async fn ingest(config: &ClipdexConfig, inputs: &[PathBuf]) -> Result<()> {
    let mut files = Vec::new();
    for input in inputs {
        collect_images(input, &mut files)
            .with_context(|| format!("failed to scan {}", input.display()))?;
    }

    let total = files.len();
    if total == 0 {
        println!("No image files found.");
        return Ok(());
    }

    let store = Arc::new(super::open_store(config)?);
    let provider = super::open_provider(config)?;
    let upload_dir = config.resolved_upload_dir();
    std::fs::create_dir_all(&upload_dir)
        .with_context(|| format!("failed to create {}", upload_dir.display()))?;

    println!("Ingesting {total} image(s) into {}...", upload_dir.display());

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );

    let mut stored = 0usize;
    for file in files {
        let Some(name) = file.file_name() else {
            pb.inc(1);
            continue;
        };
        let dest = upload_dir.join(name);
        pb.set_message(name.to_string_lossy().into_owned());

        let bytes = std::fs::read(&file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        std::fs::write(&dest, &bytes)
            .with_context(|| format!("failed to write {}", dest.display()))?;

        let provider = Arc::clone(&provider);
        let store = Arc::clone(&store);
        let dest_str = dest.to_string_lossy().into_owned();
        let outcome = tokio::task::spawn_blocking(move || -> Result<i64> {
            let embedding = provider.embed_image(&bytes)?;
            Ok(store.insert(&dest_str, &embedding)?)
        })
        .await?;
        let id = match outcome {
            Ok(id) => id,
            Err(e) => {
                let _ = std::fs::remove_file(&dest);
                return Err(e.context(format!("failed to ingest {}", file.display())));
            }
        };

        tracing::debug!(id, path = %dest.display(), "image ingested");
        stored += 1;
        pb.inc(1);
    }

    pb.finish_and_clear();
    println!("Stored {stored} image(s). Store now holds {}.", store.count()?);
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Push `path` (a file) or every image under `path` (a directory) onto `out`,
/// sorted so ids follow file-name order.
fn collect_images(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if path.is_file() {
        out.push(path.to_path_buf());
        return Ok(());
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for entry in entries {
        if entry.is_dir() {
            collect_images(&entry, out)?;
        } else if is_image(&entry) {
            out.push(entry);
        }
    }
    Ok(())
}
