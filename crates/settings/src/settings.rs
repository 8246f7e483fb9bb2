use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use polynav_workspace::config::{
    DEFAULT_BASES_DIR, DEFAULT_COMPONENTS_DIR, DEFAULT_PROJECTS_DIR, DEFAULT_SRC_SEGMENT,
    DEFAULT_TEST_SEGMENT, DEFAULT_TEST_SUFFIX,
};
use polynav_workspace::{validate_bare_name, ConfigError, CounterpartRules, WorkspaceConfig};

const SETTINGS_VERSION: u32 = 1;

/// Directory (relative to the workspace root) that holds polynav state.
/// 存放 polynav 狀態的目錄（相對於工作區根目錄）。
pub const STATE_DIR: &str = ".polynav";
pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_BUILD_COMMAND: &str = "clojure -T:build uberjar :project {project}";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize settings {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown setting '{0}'")]
    UnknownKey(String),
    #[error("invalid value for '{key}': {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: ConfigError,
    },
}

/// Location of the settings file for a workspace root.
/// 指定工作區根目錄對應的設定檔位置。
pub fn settings_path(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join(SETTINGS_FILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub counterpart: CounterpartRules,
    #[serde(default)]
    pub build: BuildSettings,
    /// Command used to open paths; the system opener is used when unset.
    #[serde(default)]
    pub opener: Option<String>,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            layout: LayoutSettings::default(),
            counterpart: CounterpartRules::default(),
            build: BuildSettings::default(),
            opener: None,
        }
    }
}

impl Settings {
    /// Replaces values that would violate workspace invariants with defaults.
    /// 將違反工作區約束的值還原為預設值。
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = SETTINGS_VERSION;
        }
        self.layout.sanitize();
        sanitize_name(&mut self.counterpart.src_segment, DEFAULT_SRC_SEGMENT);
        sanitize_name(&mut self.counterpart.test_segment, DEFAULT_TEST_SEGMENT);
        if self.counterpart.src_segment == self.counterpart.test_segment {
            self.counterpart.src_segment = DEFAULT_SRC_SEGMENT.to_string();
            self.counterpart.test_segment = DEFAULT_TEST_SEGMENT.to_string();
        }
        if self.counterpart.test_suffix.is_empty()
            || self.counterpart.test_suffix.contains(['/', '\\'])
        {
            self.counterpart.test_suffix = DEFAULT_TEST_SUFFIX.to_string();
        }
        self.build.sanitize();
        if self
            .opener
            .as_deref()
            .is_some_and(|value| value.trim().is_empty())
        {
            self.opener = None;
        }
    }

    /// Builds the immutable resolver configuration for `root`.
    /// 依據設定產生 `root` 的不可變解析設定。
    pub fn to_config(&self, root: impl Into<PathBuf>) -> Result<WorkspaceConfig, ConfigError> {
        WorkspaceConfig::with_names(
            root,
            self.layout.components_dir.as_str(),
            self.layout.bases_dir.as_str(),
            self.layout.projects_dir.as_str(),
        )?
        .with_counterpart_rules(self.counterpart.clone())
    }

    /// Reads a setting by dotted key.
    /// 以點號分隔的鍵讀取設定值。
    pub fn get(&self, key: &str) -> Result<String, SettingsError> {
        let value = match key {
            "layout.components_dir" => self.layout.components_dir.clone(),
            "layout.bases_dir" => self.layout.bases_dir.clone(),
            "layout.projects_dir" => self.layout.projects_dir.clone(),
            "counterpart.src_segment" => self.counterpart.src_segment.clone(),
            "counterpart.test_segment" => self.counterpart.test_segment.clone(),
            "counterpart.test_suffix" => self.counterpart.test_suffix.clone(),
            "build.command" => self.build.command.clone(),
            "build.log_dir" => self
                .build
                .log_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
            "opener" => self.opener.clone().unwrap_or_default(),
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Writes a setting by dotted key. An empty value clears optional settings.
    /// 以點號分隔的鍵寫入設定值；空字串會清除選用設定。
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = |source| SettingsError::InvalidValue {
            key: key.to_string(),
            source,
        };
        match key {
            "layout.components_dir" => {
                self.layout.components_dir = bare_name(key, value).map_err(invalid)?
            }
            "layout.bases_dir" => self.layout.bases_dir = bare_name(key, value).map_err(invalid)?,
            "layout.projects_dir" => {
                self.layout.projects_dir = bare_name(key, value).map_err(invalid)?
            }
            "counterpart.src_segment" | "counterpart.test_segment" | "counterpart.test_suffix" => {
                let mut rules = self.counterpart.clone();
                match key {
                    "counterpart.src_segment" => rules.src_segment = value.to_string(),
                    "counterpart.test_segment" => rules.test_segment = value.to_string(),
                    _ => rules.test_suffix = value.to_string(),
                }
                rules.validate().map_err(invalid)?;
                self.counterpart = rules;
            }
            "build.command" => {
                if value.trim().is_empty() {
                    return Err(invalid(ConfigError::EmptyName {
                        field: "build.command",
                    }));
                }
                self.build.command = value.to_string();
            }
            "build.log_dir" => self.build.log_dir = non_empty(value).map(PathBuf::from),
            "opener" => self.opener = non_empty(value).map(str::to_string),
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn bare_name(key: &str, value: &str) -> Result<String, ConfigError> {
    // validate_bare_name wants a 'static field label
    let field = match key {
        "layout.components_dir" => "components_dir",
        "layout.bases_dir" => "bases_dir",
        _ => "projects_dir",
    };
    validate_bare_name(field, value)?;
    Ok(value.to_string())
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn sanitize_name(value: &mut String, default: &str) {
    if validate_bare_name("name", value).is_err() {
        *value = default.to_string();
    }
}

/// Names of the three convention directories.
/// 三個慣例目錄的名稱。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default = "default_components_dir")]
    pub components_dir: String,
    #[serde(default = "default_bases_dir")]
    pub bases_dir: String,
    #[serde(default = "default_projects_dir")]
    pub projects_dir: String,
}

fn default_components_dir() -> String {
    DEFAULT_COMPONENTS_DIR.to_string()
}

fn default_bases_dir() -> String {
    DEFAULT_BASES_DIR.to_string()
}

fn default_projects_dir() -> String {
    DEFAULT_PROJECTS_DIR.to_string()
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            components_dir: default_components_dir(),
            bases_dir: default_bases_dir(),
            projects_dir: default_projects_dir(),
        }
    }
}

impl LayoutSettings {
    fn sanitize(&mut self) {
        sanitize_name(&mut self.components_dir, DEFAULT_COMPONENTS_DIR);
        sanitize_name(&mut self.bases_dir, DEFAULT_BASES_DIR);
        sanitize_name(&mut self.projects_dir, DEFAULT_PROJECTS_DIR);
    }
}

/// How project builds are launched and where their output goes.
/// 專案建置的啟動方式與輸出位置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Shell command template; `{project}`, `{project_dir}` and `{root}` are substituted.
    #[serde(default = "default_build_command")]
    pub command: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_build_command() -> String {
    DEFAULT_BUILD_COMMAND.to_string()
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            command: default_build_command(),
            log_dir: None,
        }
    }
}

impl BuildSettings {
    fn sanitize(&mut self) {
        if self.command.trim().is_empty() {
            self.command = default_build_command();
        }
    }

    /// Expands the command template for a project.
    /// 將指令範本展開為特定專案的指令。
    ///
    /// Placeholders are replaced in one pass and every substituted value is
    /// quoted for the platform shell, so substituted text is never expanded
    /// again.
    pub fn render(&self, project: &str, root: &Path, project_dir: &Path) -> String {
        let root = root.display().to_string();
        let project_dir = project_dir.display().to_string();
        let placeholders = [
            ("{project_dir}", project_dir.as_str()),
            ("{project}", project),
            ("{root}", root.as_str()),
        ];

        let mut rendered = String::with_capacity(self.command.len());
        let mut rest = self.command.as_str();
        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            rest = &rest[start..];
            match placeholders
                .iter()
                .find(|(placeholder, _)| rest.starts_with(placeholder))
            {
                Some((placeholder, value)) => {
                    rendered.push_str(&shell_quote(value));
                    rest = &rest[placeholder.len()..];
                }
                None => {
                    rendered.push('{');
                    rest = &rest[1..];
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }

    /// Log file that receives the output of a project's build.
    /// 專案建置輸出的日誌檔位置。
    pub fn log_file(&self, root: &Path, project: &str) -> PathBuf {
        let dir = match &self.log_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(STATE_DIR).join("logs"),
        };
        dir.join(format!("build-{project}.log"))
    }
}

fn is_shell_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "-_./:@%+=,".contains(ch)
}

// Plain values pass through unchanged; anything else is single-quoted for `sh`.
#[cfg(not(windows))]
fn shell_quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

// `cmd` has no escape for `"`, which Windows paths cannot contain anyway.
#[cfg(windows)]
fn shell_quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|ch| is_shell_safe(ch) || ch == '\\') {
        return value.to_string();
    }
    format!("\"{value}\"")
}

/// Owns the mutable settings for one workspace and persists them.
/// 管理單一工作區的可變設定並負責儲存。
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    data: Settings,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            path: path.into(),
            data: settings,
        }
    }

    /// Loads settings, falling back to defaults when the file is missing.
    /// 載入設定；若檔案不存在則使用預設值。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!(path = %path.display(), "settings file missing; using defaults");
            let mut data = Settings::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Settings =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        debug!(path = %path.display(), "settings loaded");
        Ok(Self { path, data })
    }

    /// Loads the settings stored under a workspace root.
    pub fn load_for_root(root: &Path) -> Result<Self, SettingsError> {
        Self::load(settings_path(root))
    }

    /// Re-reads the file, replacing the in-memory copy.
    /// 重新讀取設定檔並取代記憶體中的內容。
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        let fresh = Self::load(&self.path)?;
        self.data = fresh.data;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), SettingsError>
    where
        F: FnMut(&mut Settings),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    /// Sets a dotted key and persists the change.
    /// 設定指定鍵值並立即儲存。
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.data.set(key, value)?;
        self.save()
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            SettingsError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| SettingsError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
