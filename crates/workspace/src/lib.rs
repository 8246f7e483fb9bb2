//! Path resolution primitives for component/base/project workspaces.
//! 元件／基底／專案工作區的路徑解析核心模組。

pub mod config;
pub mod counterpart;
pub mod discovery;
pub mod listing;
pub mod notice;

pub use config::{
    resolve_bases_dir, resolve_components_dir, resolve_dir, resolve_projects_dir,
    validate_bare_name, ConfigError, CounterpartRules, TargetKind, WorkspaceConfig,
};
pub use counterpart::{classify, to_counterpart, CounterpartDirection};
pub use discovery::{discover_root, DEFAULT_ROOT_MARKER};
pub use listing::{list_immediate_directories, list_project_names, DirectoryEntry};
pub use notice::Notice;
