#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DOCUMENT: &str = r#"{
  "version": 1,
  "attributes": [
    {
      "name": "Invoice",
      "text": "INV-1",
      "viewed": true,
      "children": [
        {
          "name": "Qty",
          "text": "200",
          "validity": "Invalid",
          "validation_message": "too many"
        }
      ]
    },
    { "name": "Vendor", "text": "ACME" }
  ]
}"#;

fn attrhost_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("attrhost"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("NO_COLOR", "1")
        .env_remove("ATTRHOST_LOG");
    cmd
}

fn setup() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let doc = temp.path().join("doc.json");
    fs::write(&doc, DOCUMENT).unwrap();
    (temp, doc)
}

#[test]
fn test_summary_lists_attributes_in_tab_order() {
    let (temp, doc) = setup();
    attrhost_cmd(temp.path())
        .args(["summary"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "3 attributes, 2 unviewed, 1 invalid",
        ))
        .stdout(predicate::str::contains("1  Invoice"))
        .stdout(predicate::str::contains("2  Invoice/Qty"))
        .stdout(predicate::str::contains("invalid: too many"))
        .stdout(predicate::str::contains("3  Vendor"));
}

#[test]
fn test_summary_json() {
    let (temp, doc) = setup();
    let output = attrhost_cmd(temp.path())
        .args(["summary", "--json"])
        .arg(&doc)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["attributes"], 3);
    assert_eq!(value["unviewed"], 2);
    assert_eq!(value["items"][1]["path"], "Invoice/Qty");
}

#[test]
fn test_next_follows_tab_order() {
    let (temp, doc) = setup();
    attrhost_cmd(temp.path())
        .args(["next"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("1  Invoice"));

    attrhost_cmd(temp.path())
        .args(["next", "--after", "1"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("2  Invoice/Qty"));

    attrhost_cmd(temp.path())
        .args(["next", "--backward"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("3  Vendor"));
}

#[test]
fn test_next_unviewed_skips_viewed_attributes() {
    let (temp, doc) = setup();
    attrhost_cmd(temp.path())
        .args(["next", "--unviewed", "--after", "2"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("3  Vendor"));
}

#[test]
fn test_view_marks_and_saves() {
    let (temp, doc) = setup();
    attrhost_cmd(temp.path())
        .args(["view"])
        .arg(&doc)
        .arg("3")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Marked 1 attribute(s) viewed, 1 unviewed left",
        ));

    attrhost_cmd(temp.path())
        .args(["summary"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "3 attributes, 1 unviewed, 1 invalid",
        ));
}

#[test]
fn test_view_all_reports_none_left() {
    let (temp, doc) = setup();
    attrhost_cmd(temp.path())
        .args(["view", "--all"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("Every attribute has been viewed"));

    attrhost_cmd(temp.path())
        .args(["next", "--unviewed"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("No unviewed attribute found"));
}

#[test]
fn test_view_rejects_unknown_index() {
    let (temp, doc) = setup();
    attrhost_cmd(temp.path())
        .args(["view"])
        .arg(&doc)
        .arg("9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no attribute at index 9"));
}

#[test]
fn test_save_check_refuses_invalid_document() {
    let (temp, doc) = setup();
    attrhost_cmd(temp.path())
        .args(["save-check"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Save refused: first invalid attribute is 2 Invoice/Qty",
        ));
}

#[test]
fn test_save_check_with_config_file() {
    let (temp, doc) = setup();
    let config = temp.path().join("attrhost.toml");
    fs::write(&config, "invalid_policy = \"allow\"\n").unwrap();

    attrhost_cmd(temp.path())
        .arg("-c")
        .arg(&config)
        .args(["save-check"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Save needs confirmation: 2 unviewed attribute(s)",
        ))
        .stdout(predicate::str::contains("2 Invoice/Qty"))
        .stdout(predicate::str::contains("3 Vendor"));
}

#[test]
fn test_corrupt_document_is_an_error() {
    let (temp, doc) = setup();
    fs::write(&doc, "{ not json").unwrap();
    attrhost_cmd(temp.path())
        .args(["summary"])
        .arg(&doc)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_config_prints_defaults() {
    let temp = TempDir::new().unwrap();
    attrhost_cmd(temp.path())
        .args(["config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"invalid_policy\": \"disallow\""))
        .stdout(predicate::str::contains("\"unviewed_policy\": \"prompt_once\""));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    attrhost_cmd(temp.path())
        .args(["config", "-c"])
        .arg(temp.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
