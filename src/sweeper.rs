//! Retention sweep over the output directory.
//!
//! The slideshow cache is rolling: anything older than the retention
//! window is evicted, and anything that is not a known image/video/log
//! file is evicted regardless of age (stray HTML snapshots, partial
//! downloads, editor droppings). Deletion failures are logged and the
//! sweep continues over the remaining files.

use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info, instrument, warn};

/// Final file extensions allowed to survive a sweep, lowercase, no dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "gif", "bmp", "mp4", "log"];

const SECONDS_PER_DAY: u64 = 86_400;

/// Decide whether one file should be deleted.
///
/// A file goes when its age exceeds `retention_days` OR its extension is
/// not in `allowed_extensions` (case-insensitive). A file aged exactly
/// at the window boundary is kept; the rule is strictly "older than".
pub fn should_delete(
    modified: SystemTime,
    now: SystemTime,
    retention_days: u64,
    extension: Option<&str>,
    allowed_extensions: &[&str],
) -> bool {
    let allowed = extension
        .map(|ext| {
            let lowered = ext.to_lowercase();
            allowed_extensions.iter().any(|a| *a == lowered)
        })
        .unwrap_or(false);
    if !allowed {
        return true;
    }

    match now.duration_since(modified) {
        Ok(age) => age.as_secs() > retention_days * SECONDS_PER_DAY,
        // Modified in the future; treat as fresh.
        Err(_) => false,
    }
}

/// Sweep `directory`, deleting every file that fails the retention or
/// extension rule. Subdirectories are left alone. Returns the number of
/// files deleted.
///
/// Per-file metadata and deletion failures are logged and skipped; only
/// an unreadable directory is an error.
#[instrument(level = "info", skip_all, fields(directory = %directory.display(), retention_days))]
pub fn sweep(
    directory: &Path,
    retention_days: u64,
    allowed_extensions: &[&str],
) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut deleted = 0usize;

    for entry in fs::read_dir(directory)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read file time; skipping");
                continue;
            }
        };
        let extension = path.extension().and_then(|e| e.to_str());

        if !should_delete(modified, now, retention_days, extension, allowed_extensions) {
            debug!(path = %path.display(), "Retained");
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Deleted stale file");
                deleted += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete file; continuing");
            }
        }
    }

    info!(deleted, "Retention sweep complete");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes, OpenOptions};
    use std::time::Duration;
    use tempfile::tempdir;

    fn days_ago(days: u64) -> SystemTime {
        SystemTime::now() - Duration::from_secs(days * SECONDS_PER_DAY)
    }

    #[test]
    fn test_should_delete_age_rule() {
        let now = SystemTime::now();
        assert!(should_delete(days_ago(15), now, 14, Some("jpg"), ALLOWED_EXTENSIONS));
        assert!(!should_delete(days_ago(13), now, 14, Some("jpg"), ALLOWED_EXTENSIONS));
    }

    #[test]
    fn test_should_delete_extension_rule() {
        let now = SystemTime::now();
        // Disallowed extension goes regardless of age.
        assert!(should_delete(now, now, 14, Some("txt"), ALLOWED_EXTENSIONS));
        assert!(should_delete(now, now, 14, None, ALLOWED_EXTENSIONS));
        assert!(!should_delete(now, now, 14, Some("JPG"), ALLOWED_EXTENSIONS));
        assert!(!should_delete(now, now, 14, Some("mp4"), ALLOWED_EXTENSIONS));
        assert!(!should_delete(now, now, 14, Some("log"), ALLOWED_EXTENSIONS));
    }

    #[test]
    fn test_sweep_deletes_old_and_disallowed_files() {
        let dir = tempdir().unwrap();

        let fresh_jpg = dir.path().join("0001_fresh.jpg");
        File::create(&fresh_jpg).unwrap();

        let stray_txt = dir.path().join("notes.txt");
        File::create(&stray_txt).unwrap();

        let old_jpg = dir.path().join("0002_old.jpg");
        File::create(&old_jpg).unwrap();
        let file = OpenOptions::new().write(true).open(&old_jpg).unwrap();
        file.set_times(FileTimes::new().set_modified(days_ago(15)))
            .unwrap();

        let deleted = sweep(dir.path(), 14, ALLOWED_EXTENSIONS).unwrap();
        assert_eq!(deleted, 2);
        assert!(fresh_jpg.exists());
        assert!(!stray_txt.exists());
        assert!(!old_jpg.exists());
    }

    #[test]
    fn test_sweep_ignores_subdirectories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let deleted = sweep(dir.path(), 14, ALLOWED_EXTENSIONS).unwrap();
        assert_eq!(deleted, 0);
        assert!(dir.path().join("nested").exists());
    }
}
