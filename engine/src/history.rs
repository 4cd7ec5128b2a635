use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use log::warn;

use crate::error::{Error, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Clone)]
pub struct RecentEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

#[derive(Debug, Default)]
pub struct Recent {
    /// Newest first
    pub entries: Vec<RecentEntry>,
    /// Number of images in the directory, including the ones cut off by the limit
    pub total: usize,
}

impl Recent {
    pub fn hidden(&self) -> usize {
        self.total - self.entries.len()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Lists at most `limit` images in `dir`, most recently modified first.
/// A directory that doesn't exist yet simply has no history. Entries that vanish or can't be
/// stat'ed mid-scan (dangling symlinks, concurrent deletes) are skipped.
pub fn recent(dir: &Path, limit: usize) -> Result<Recent> {
    if !dir.exists() {
        return Ok(Recent::default());
    }

    let mut entries = vec![];
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if !is_image(&path) {
            continue;
        }
        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let modified = match meta.modified() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        entries.push(RecentEntry {
            path,
            size: meta.len(),
            modified,
        });
    }

    entries.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.path.cmp(&b.path))
    });
    let total = entries.len();
    entries.truncate(limit);

    Ok(Recent { entries, total })
}
