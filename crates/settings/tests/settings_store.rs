use polynav_settings::{settings_path, Settings, SettingsError, SettingsStore};
use std::fs;
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let store = SettingsStore::load_for_root(temp.path()).expect("load defaults");

    let settings = store.settings();
    assert_eq!(settings.layout.components_dir, "components");
    assert_eq!(settings.layout.bases_dir, "bases");
    assert_eq!(settings.layout.projects_dir, "projects");
    assert_eq!(settings.counterpart.test_suffix, "_test");
    assert_eq!(store.path(), settings_path(temp.path()));
    assert!(!store.path().exists(), "loading must not create the file");
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let path = settings_path(temp.path());

    let mut store = SettingsStore::new(path.clone(), Settings::default());
    store
        .update(|settings| {
            settings.layout.components_dir = "comps".to_string();
            settings.build.command = "make {project}".to_string();
        })
        .expect("save");

    let reloaded = SettingsStore::load(&path).expect("reload");
    assert_eq!(reloaded.settings().layout.components_dir, "comps");
    assert_eq!(reloaded.settings().build.command, "make {project}");
}

#[test]
fn partial_file_is_filled_with_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = settings_path(temp.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"{ "layout": { "bases_dir": "entrypoints" }, "opener": "code", "future_key": 1 }"#,
    )
    .unwrap();

    let store = SettingsStore::load(&path).expect("load");
    let settings = store.settings();
    assert_eq!(settings.version, 1);
    assert_eq!(settings.layout.bases_dir, "entrypoints");
    assert_eq!(settings.layout.components_dir, "components");
    assert_eq!(settings.opener.as_deref(), Some("code"));

    let config = settings.to_config(temp.path()).expect("config");
    assert_eq!(config.bases_dir(), "entrypoints");
}

#[test]
fn set_persists_and_reload_observes_external_edits() {
    let temp = tempdir().expect("tempdir");
    let mut store = SettingsStore::load_for_root(temp.path()).expect("load");
    store.set("layout.projects_dir", "deploy").expect("set");

    let mut other = SettingsStore::load_for_root(temp.path()).expect("second handle");
    assert_eq!(other.settings().layout.projects_dir, "deploy");

    store.set("layout.projects_dir", "apps").expect("set again");
    other.reload().expect("reload");
    assert_eq!(other.settings().layout.projects_dir, "apps");
}

#[test]
fn malformed_file_reports_parse_error() {
    let temp = tempdir().expect("tempdir");
    let path = settings_path(temp.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ not json").unwrap();

    let err = SettingsStore::load(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }));
}
