use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Replaces the file at `path` with `contents` atomically.
///
/// Writes to a temporary file in the same directory, syncs it to disk, then
/// renames it over the destination. On any failure the temporary file is
/// removed and an existing file at `path` is left as it was.
pub fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    // SEC-009: Per-process, per-call temp name; create_new below refuses a
    // name that already exists
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{}.{:016x}", std::process::id(), nanos));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true) // Fails atomically if file exists (prevents symlink race)
        .open(&temp_path)
        .with_context(|| {
            format!(
                "Failed to create temporary file '{}': check directory permissions",
                temp_path.display()
            )
        })?;

    file.write_all(contents.as_bytes()).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to write feed to temporary file '{}': disk may be full",
            temp_path.display()
        )
    })?;

    file.sync_all().with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to sync temporary file '{}' to disk",
            temp_path.display()
        )
    })?;

    drop(file);

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if path.exists() {
        std::fs::remove_file(path).with_context(|| {
            let _ = std::fs::remove_file(&temp_path);
            format!(
                "Failed to remove existing '{}' before atomic replace",
                path.display()
            )
        })?;
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to rename '{}' to '{}'",
            temp_path.display(),
            path.display()
        )
    })?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote feed file");
    Ok(())
}
