use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn polynav(root: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("polynav")?;
    cmd.arg("--workspace")
        .arg(root)
        .env_remove("POLYNAV_WORKSPACE")
        .env_remove("POLYNAV_LOG");
    Ok(cmd)
}

#[test]
fn show_prints_defaults_without_writing() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    polynav(workspace.path())?
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"components_dir\": \"components\"")
                .and(predicate::str::contains("\"test_suffix\": \"_test\""))
                .and(predicate::str::contains("{project}")),
        );
    assert!(!workspace.path().join(".polynav").exists());
    Ok(())
}

#[test]
fn set_persists_and_get_reads_back() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    polynav(workspace.path())?
        .args(["config", "set", "counterpart.test_suffix", "-spec"])
        .assert()
        .success()
        .stdout("Set counterpart.test_suffix = -spec\n");

    polynav(workspace.path())?
        .args(["config", "get", "counterpart.test_suffix"])
        .assert()
        .success()
        .stdout("-spec\n");

    let settings = workspace.path().join(".polynav").join("settings.json");
    polynav(workspace.path())?
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(format!("{}\n", settings.display()));
    assert!(fs::read_to_string(settings)?.contains("\"test_suffix\": \"-spec\""));
    Ok(())
}

#[test]
fn custom_counterpart_rules_drive_toggle() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    for (key, value) in [
        ("counterpart.src_segment", "main"),
        ("counterpart.test_segment", "spec"),
        ("counterpart.test_suffix", ".spec"),
    ] {
        polynav(workspace.path())?
            .args(["config", "set", key, value])
            .assert()
            .success();
    }

    let source = workspace.path().join("app").join("main").join("button.ts");
    let expected = workspace.path().join("app").join("spec").join("button.spec.ts");
    polynav(workspace.path())?
        .args(["toggle", "--print"])
        .arg(&source)
        .assert()
        .success()
        .stdout(format!("{}\n", expected.display()));
    Ok(())
}

#[test]
fn invalid_values_and_keys_are_rejected() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    polynav(workspace.path())?
        .args(["config", "set", "layout.bases_dir", "nested/bases"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a bare name"));

    polynav(workspace.path())?
        .args(["config", "get", "editor.theme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown setting 'editor.theme'"));
    Ok(())
}

#[test]
fn malformed_settings_file_is_an_error() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let dir = workspace.path().join(".polynav");
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("settings.json"), "[1, 2")?;

    polynav(workspace.path())?
        .args(["list", "components"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load settings"));
    Ok(())
}
