use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn sample_workspace(root: &Path) -> Result<(), Box<dyn Error>> {
    fs::write(root.join("workspace.edn"), "{:top-namespace \"acme\"}")?;
    for dir in [
        "components/auth",
        "components/billing",
        "bases/rest-api",
        "projects/api",
        "projects/worker",
    ] {
        fs::create_dir_all(root.join(dir))?;
    }
    fs::write(root.join("components").join("README.md"), "not a component")?;
    Ok(())
}

fn polynav(root: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("polynav")?;
    cmd.arg("--workspace")
        .arg(root)
        .env_remove("POLYNAV_WORKSPACE")
        .env_remove("POLYNAV_LOG");
    Ok(cmd)
}

#[test]
fn list_prints_sorted_names_without_files() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    sample_workspace(workspace.path())?;

    polynav(workspace.path())?
        .args(["list", "components"])
        .assert()
        .success()
        .stdout("auth\nbilling\n");

    polynav(workspace.path())?
        .args(["list", "project"])
        .assert()
        .success()
        .stdout("api\nworker\n");
    Ok(())
}

#[test]
fn list_missing_directory_is_informational() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    polynav(workspace.path())?
        .args(["list", "base"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("info: bases directory").and(
            predicate::str::contains("does not exist"),
        ));
    Ok(())
}

#[test]
fn find_component_with_selection_prints_path() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    sample_workspace(workspace.path())?;

    let expected = workspace.path().join("components").join("billing");
    polynav(workspace.path())?
        .args(["find-component", "--select", "billing", "--print"])
        .assert()
        .success()
        .stdout(format!("{}\n", expected.display()));
    Ok(())
}

#[test]
fn find_base_rejects_unknown_selection() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    sample_workspace(workspace.path())?;

    polynav(workspace.path())?
        .args(["find-base", "--select", "cli", "--print"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'cli' is not one of: rest-api"));
    Ok(())
}

#[test]
fn components_dir_honours_configured_name() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    fs::create_dir_all(workspace.path().join("comps").join("auth"))?;

    polynav(workspace.path())?
        .args(["config", "set", "layout.components_dir", "comps"])
        .assert()
        .success();

    polynav(workspace.path())?
        .args(["components-dir", "--print"])
        .assert()
        .success()
        .stdout(format!("{}\n", workspace.path().join("comps").display()));
    Ok(())
}

#[test]
fn workspace_is_discovered_from_nested_directory() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    sample_workspace(workspace.path())?;
    let nested = workspace.path().join("components").join("auth");

    Command::cargo_bin("polynav")?
        .current_dir(&nested)
        .env_remove("POLYNAV_WORKSPACE")
        .env_remove("POLYNAV_ROOT_MARKER")
        .args(["list", "bases"])
        .assert()
        .success()
        .stdout("rest-api\n");
    Ok(())
}

#[test]
fn toggle_print_maps_both_directions() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let source = workspace
        .path()
        .join("components/auth/src/acme/auth/core.clj");
    let test = workspace
        .path()
        .join("components/auth/test/acme/auth/core_test.clj");
    fs::create_dir_all(source.parent().unwrap())?;
    fs::write(&source, "(ns acme.auth.core)")?;

    polynav(workspace.path())?
        .args(["toggle", "--print"])
        .arg(&source)
        .assert()
        .success()
        .stdout(format!("{}\n", test.display()))
        .stderr(predicate::str::contains("does not exist"));
    assert!(!test.exists(), "--print must never create files");

    polynav(workspace.path())?
        .args(["toggle", "--print"])
        .arg(&test)
        .assert()
        .success()
        .stdout(format!("{}\n", source.display()));
    Ok(())
}

#[test]
fn toggle_ignores_segments_above_workspace_root() -> Result<(), Box<dyn Error>> {
    let outer = tempdir()?;
    let root = outer.path().join("src").join("myws");
    let source = root.join("components/auth/src/acme/auth/core.clj");
    let test = root.join("components/auth/test/acme/auth/core_test.clj");
    fs::create_dir_all(source.parent().unwrap())?;
    fs::write(&source, "(ns acme.auth.core)")?;

    polynav(&root)?
        .args(["toggle", "--print"])
        .arg(&source)
        .assert()
        .success()
        .stdout(format!("{}\n", test.display()));

    polynav(&root)?
        .args(["toggle", "--print"])
        .arg(&test)
        .assert()
        .success()
        .stdout(format!("{}\n", source.display()));
    Ok(())
}

#[test]
fn toggle_without_convention_reports_no_counterpart() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let file = workspace.path().join("other").join("foo.clj");

    polynav(workspace.path())?
        .args(["toggle", "--print"])
        .arg(&file)
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("no counterpart determinable"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn toggle_creates_missing_counterpart_and_opens_it() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let source = workspace.path().join("bases/rest-api/src/acme/api.clj");
    fs::create_dir_all(source.parent().unwrap())?;
    fs::write(&source, "(ns acme.api)")?;

    polynav(workspace.path())?
        .args(["config", "set", "opener", "echo opened"])
        .assert()
        .success();

    let test = workspace.path().join("bases/rest-api/test/acme/api_test.clj");
    polynav(workspace.path())?
        .args(["toggle", "--yes"])
        .arg(&source)
        .assert()
        .success()
        .stdout(format!("opened {}\n", test.display()));
    assert!(test.is_file());
    assert_eq!(fs::read_to_string(&test)?, "");
    Ok(())
}
