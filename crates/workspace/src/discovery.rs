use std::path::{Path, PathBuf};

use tracing::debug;

/// File whose presence marks a workspace root.
/// 標示工作區根目錄的檔案名稱。
pub const DEFAULT_ROOT_MARKER: &str = "workspace.edn";

/// Walks from `start` upward and returns the first directory holding `marker`.
/// 從 `start` 往上層尋找，回傳第一個包含 `marker` 的目錄。
pub fn discover_root(start: &Path, marker: &str) -> Option<PathBuf> {
    let found = start
        .ancestors()
        .find(|candidate| candidate.join(marker).is_file())
        .map(Path::to_path_buf);
    match &found {
        Some(root) => debug!(root = %root.display(), marker, "workspace root discovered"),
        None => debug!(start = %start.display(), marker, "no workspace marker found"),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_marker_in_ancestor() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join(DEFAULT_ROOT_MARKER), "{}").unwrap();
        let nested = tmp.path().join("components").join("auth").join("src");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            discover_root(&nested, DEFAULT_ROOT_MARKER),
            Some(tmp.path().to_path_buf())
        );
    }

    #[test]
    fn nearest_marker_wins() {
        let tmp = tempdir().unwrap();
        let inner = tmp.path().join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(tmp.path().join("ws.marker"), "").unwrap();
        fs::write(inner.join("ws.marker"), "").unwrap();

        assert_eq!(discover_root(&inner, "ws.marker"), Some(inner.clone()));
    }

    #[test]
    fn directory_named_like_marker_is_ignored() {
        let tmp = tempdir().unwrap();
        let start = tmp.path().join("a");
        fs::create_dir_all(start.join("unlikely-marker-name")).unwrap();
        assert_eq!(discover_root(&start, "unlikely-marker-name"), None);
    }
}
