use std::fmt;
use std::path::PathBuf;

use crate::config::TargetKind;

/// Non-fatal outcomes surfaced to the user as informational messages.
/// 以提示訊息呈現給使用者的非致命結果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The directory to list does not exist or is not a directory.
    DirectoryNotFound { kind: TargetKind, path: PathBuf },
    /// The directory exists but holds no subdirectories.
    NothingToChoose { kind: TargetKind, path: PathBuf },
    /// No source/test convention matched the file.
    NoCounterpart(PathBuf),
    /// The counterpart was computed but is not on disk.
    TargetMissing(PathBuf),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DirectoryNotFound { kind, path } => write!(
                f,
                "{} directory {} does not exist",
                kind.plural(),
                path.display()
            ),
            Notice::NothingToChoose { kind, path } => {
                write!(f, "no {} found in {}", kind.plural(), path.display())
            }
            Notice::NoCounterpart(path) => {
                write!(f, "no counterpart determinable for {}", path.display())
            }
            Notice::TargetMissing(path) => write!(f, "{} does not exist", path.display()),
        }
    }
}

impl Notice {
    /// Notice for an empty listing of `path`, distinguishing a missing directory.
    /// 依目錄是否存在，產生空清單對應的提示。
    pub fn for_empty_listing(kind: TargetKind, path: PathBuf) -> Self {
        if path.is_dir() {
            Notice::NothingToChoose { kind, path }
        } else {
            Notice::DirectoryNotFound { kind, path }
        }
    }
}
