//! Persisted, user-editable settings for polynav workspaces.
//! polynav 工作區的持久化使用者設定。

pub mod settings;

pub use settings::{
    settings_path, BuildSettings, LayoutSettings, Settings, SettingsError, SettingsStore,
    DEFAULT_BUILD_COMMAND, SETTINGS_FILE, STATE_DIR,
};
