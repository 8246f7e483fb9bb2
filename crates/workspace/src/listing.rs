use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// A direct child directory of a listing root.
/// 列舉根目錄底下的直接子目錄。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Lists the immediate subdirectories of `root`.
/// 列出 `root` 的直接子目錄。
///
/// A missing root, or one that is not a directory, yields an empty listing
/// rather than an error. Plain files are skipped and symlinks that point at
/// directories are included. Order follows filesystem enumeration; sort the
/// result when a stable order matters.
pub fn list_immediate_directories(root: &Path) -> Vec<DirectoryEntry> {
    if !root.is_dir() {
        debug!(root = %root.display(), "listing root is not a directory");
        return Vec::new();
    }

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(root = %root.display(), error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| DirectoryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.into_path(),
        })
        .collect()
}

/// Lists only the names of the immediate subdirectories of `root`.
/// 僅列出 `root` 直接子目錄的名稱。
pub fn list_project_names(root: &Path) -> Vec<String> {
    list_immediate_directories(root)
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}
