use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_COMPONENTS_DIR: &str = "components";
pub const DEFAULT_BASES_DIR: &str = "bases";
pub const DEFAULT_PROJECTS_DIR: &str = "projects";
pub const DEFAULT_SRC_SEGMENT: &str = "src";
pub const DEFAULT_TEST_SEGMENT: &str = "test";
pub const DEFAULT_TEST_SUFFIX: &str = "_test";

/// Errors raised when a workspace configuration violates its invariants.
/// 工作區設定違反約束時回傳的錯誤。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workspace root must be an absolute path: {0}")]
    RelativeRoot(PathBuf),
    #[error("{field} cannot be empty")]
    EmptyName { field: &'static str },
    #[error("{field} must be a bare name without path separators: '{value}'")]
    NotBareName { field: &'static str, value: String },
    #[error("src_segment and test_segment must differ: both are '{0}'")]
    SameSegments(String),
}

/// Which kind of workspace directory an operation targets.
/// 操作所針對的工作區目錄種類。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Component,
    Base,
    Project,
}

impl TargetKind {
    /// Singular label used in prompts and messages.
    /// 提示與訊息中使用的單數名稱。
    pub fn label(self) -> &'static str {
        match self {
            TargetKind::Component => "component",
            TargetKind::Base => "base",
            TargetKind::Project => "project",
        }
    }

    /// Plural label used in prompts and messages.
    pub fn plural(self) -> &'static str {
        match self {
            TargetKind::Component => "components",
            TargetKind::Base => "bases",
            TargetKind::Project => "projects",
        }
    }

    fn dir_name(self, config: &WorkspaceConfig) -> &str {
        match self {
            TargetKind::Component => &config.components_dir,
            TargetKind::Base => &config.bases_dir,
            TargetKind::Project => &config.projects_dir,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Segment and suffix markers that pair a source file with its test.
/// 將原始碼檔案與測試檔案配對的路徑片段與後綴設定。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartRules {
    #[serde(default = "default_src_segment")]
    pub src_segment: String,
    #[serde(default = "default_test_segment")]
    pub test_segment: String,
    #[serde(default = "default_test_suffix")]
    pub test_suffix: String,
}

fn default_src_segment() -> String {
    DEFAULT_SRC_SEGMENT.to_string()
}

fn default_test_segment() -> String {
    DEFAULT_TEST_SEGMENT.to_string()
}

fn default_test_suffix() -> String {
    DEFAULT_TEST_SUFFIX.to_string()
}

impl Default for CounterpartRules {
    fn default() -> Self {
        Self {
            src_segment: default_src_segment(),
            test_segment: default_test_segment(),
            test_suffix: default_test_suffix(),
        }
    }
}

impl CounterpartRules {
    /// Checks that both segments are distinct bare names and the suffix is non-empty.
    /// 檢查路徑片段皆為單一名稱，且後綴不得為空。
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bare_name("src_segment", &self.src_segment)?;
        validate_bare_name("test_segment", &self.test_segment)?;
        if self.src_segment == self.test_segment {
            return Err(ConfigError::SameSegments(self.src_segment.clone()));
        }
        if self.test_suffix.is_empty() {
            return Err(ConfigError::EmptyName {
                field: "test_suffix",
            });
        }
        if self.test_suffix.contains(['/', '\\']) {
            return Err(ConfigError::NotBareName {
                field: "test_suffix",
                value: self.test_suffix.clone(),
            });
        }
        Ok(())
    }
}

/// Immutable description of a workspace and its directory naming.
/// 工作區與其目錄命名方式的不可變描述。
///
/// Built once from settings and handed to every resolver operation; the
/// settings layer owns the mutable copy and rebuilds this value on reload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkspaceConfig {
    root: PathBuf,
    components_dir: String,
    bases_dir: String,
    projects_dir: String,
    counterpart: CounterpartRules,
}

impl WorkspaceConfig {
    /// Creates a config with the default directory names.
    /// 以預設目錄名稱建立設定。
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::with_names(
            root,
            DEFAULT_COMPONENTS_DIR,
            DEFAULT_BASES_DIR,
            DEFAULT_PROJECTS_DIR,
        )
    }

    /// Creates a config with explicit directory names, validating each one.
    /// 以指定的目錄名稱建立設定並逐一驗證。
    pub fn with_names(
        root: impl Into<PathBuf>,
        components_dir: impl Into<String>,
        bases_dir: impl Into<String>,
        projects_dir: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(ConfigError::RelativeRoot(root));
        }
        let components_dir = components_dir.into();
        let bases_dir = bases_dir.into();
        let projects_dir = projects_dir.into();
        validate_bare_name("components_dir", &components_dir)?;
        validate_bare_name("bases_dir", &bases_dir)?;
        validate_bare_name("projects_dir", &projects_dir)?;

        Ok(Self {
            root: normalize_root(&root),
            components_dir,
            bases_dir,
            projects_dir,
            counterpart: CounterpartRules::default(),
        })
    }

    /// Replaces the counterpart rules after validating them.
    /// 驗證後替換對應檔規則。
    pub fn with_counterpart_rules(mut self, rules: CounterpartRules) -> Result<Self, ConfigError> {
        rules.validate()?;
        self.counterpart = rules;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn components_dir(&self) -> &str {
        &self.components_dir
    }

    pub fn bases_dir(&self) -> &str {
        &self.bases_dir
    }

    pub fn projects_dir(&self) -> &str {
        &self.projects_dir
    }

    pub fn counterpart_rules(&self) -> &CounterpartRules {
        &self.counterpart
    }
}

/// `root` joined with the components directory name.
/// 工作區根目錄加上元件目錄名稱。
pub fn resolve_components_dir(config: &WorkspaceConfig) -> PathBuf {
    resolve_dir(config, TargetKind::Component)
}

/// `root` joined with the bases directory name.
pub fn resolve_bases_dir(config: &WorkspaceConfig) -> PathBuf {
    resolve_dir(config, TargetKind::Base)
}

/// `root` joined with the projects directory name.
pub fn resolve_projects_dir(config: &WorkspaceConfig) -> PathBuf {
    resolve_dir(config, TargetKind::Project)
}

/// Resolves the directory for `kind`. Pure path arithmetic; nothing is checked on disk.
/// 解析指定種類的目錄；僅做路徑運算，不檢查檔案系統。
pub fn resolve_dir(config: &WorkspaceConfig, kind: TargetKind) -> PathBuf {
    config.root.join(kind.dir_name(config))
}

/// Checks that `value` is a single, non-empty path component.
/// 檢查 `value` 是否為單一且非空的路徑片段。
pub fn validate_bare_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyName { field });
    }
    let mut components = Path::new(value).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if !single_normal || value.contains(['/', '\\']) {
        return Err(ConfigError::NotBareName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

// Drops trailing separators and `.` segments so joins compare equal.
fn normalize_root(root: &Path) -> PathBuf {
    root.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
