#![cfg(feature = "cli")]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

#[allow(deprecated)]
fn gm_screen(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gm-screen").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn test_list_empty_store() {
    let dir = tempdir().unwrap();

    gm_screen(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No datasets stored."));
}

#[test]
fn test_add_block_then_show() {
    let dir = tempdir().unwrap();

    gm_screen(dir.path())
        .args([
            "add-block",
            "--dataset",
            "camp",
            "--x",
            "40",
            "--heading",
            "Goblins",
            "--text",
            "Ambush",
            "--text",
            "at dawn",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added block to dataset 'camp'"));

    gm_screen(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* camp"));

    gm_screen(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("GM Screen(camp)"))
        .stdout(predicate::str::contains("left=40px"))
        .stdout(predicate::str::contains("blockHeader \"Goblins\""))
        .stdout(predicate::str::contains("blockContent Ambush | at dawn"));
}

#[test]
fn test_show_json_prints_document() {
    let dir = tempdir().unwrap();
    gm_screen(dir.path())
        .args(["add-block", "--dataset", "camp", "--text", "Ambush"])
        .assert()
        .success();

    let output = gm_screen(dir.path())
        .args(["show", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let data = json.get("data").unwrap().as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["type"], "block");
    assert_eq!(data[0]["children"][0]["text"], "Title");
    assert_eq!(
        data[0]["children"][1]["data"]["blocks"][0]["data"]["text"],
        "Ambush"
    );
}

#[test]
fn test_export_clear_and_import() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("out")).unwrap();
    gm_screen(dir.path())
        .args(["add-block", "--dataset", "camp", "--heading", "Goblins"])
        .assert()
        .success();

    gm_screen(dir.path())
        .args(["export", "--dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("camp.json"));
    let exported = dir.path().join("out").join("camp.json");
    assert!(exported.exists());

    gm_screen(dir.path())
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared all datasets"));
    gm_screen(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No datasets stored."));

    gm_screen(dir.path())
        .args(["import", "out/camp.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Imported 1 block(s) into dataset 'camp'",
        ));
    gm_screen(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Goblins"));
}

#[test]
fn test_export_under_new_name() {
    let dir = tempdir().unwrap();
    gm_screen(dir.path())
        .args(["add-block", "--x", "3"])
        .assert()
        .success();

    gm_screen(dir.path())
        .args(["export", "--name", "Tower.json"])
        .assert()
        .success();
    assert!(dir.path().join("Tower.json").exists());

    gm_screen(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* Tower"))
        .stdout(predicate::str::contains("unspecified"));
}

#[test]
fn test_export_unnamed_dataset_fails() {
    let dir = tempdir().unwrap();

    gm_screen(dir.path())
        .arg("export")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("a dataset name is required"));
}

#[test]
fn test_import_rejects_non_json_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), r#"{"data": []}"#).unwrap();

    gm_screen(dir.path())
        .args(["import", "notes.txt"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("is not a .json file"));
}
