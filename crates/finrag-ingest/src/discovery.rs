//! Input directory enumeration

use crate::error::IngestError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Regular files under `root`, sorted by path
///
/// Only immediate children are listed unless `recursive` is set. Symlinks
/// are not followed and are skipped like any other non-regular entry.
pub fn discover_files(root: impl AsRef<Path>, recursive: bool) -> Result<Vec<PathBuf>, IngestError> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(IngestError::InvalidInput(format!(
            "input directory {} does not exist",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(IngestError::InvalidInput(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry under {}: {}", root.display(), e),
        }
    }

    files.sort();
    Ok(files)
}
