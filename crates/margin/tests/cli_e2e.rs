#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CAPTURE: &str = r#"{
    "expositionId": "501",
    "weaveId": "502",
    "url": "https://example.org/view/501/502",
    "pageTitle": "Harbour survey",
    "regions": [
        {"id": "tool-a", "type": "tool-text", "title": "Opening",
         "textMarkup": "<p>Gulls circle the old pier at dawn.</p>"},
        {"id": "tool-b", "type": "tool-image"}
    ]
}"#;

fn margin_cmd(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("margin"));
    cmd.env("MARGIN_DATA", temp.path().join("global"))
        .env_remove("MARGIN_LOG")
        .current_dir(temp.path())
        .args(["--data", temp.path().join("data").to_str().unwrap()]);
    cmd
}

fn write_capture(dir: &Path) -> String {
    let path = dir.join("page.json");
    fs::write(&path, CAPTURE).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_scan_suggest_list_delete_workflow() {
    let temp = TempDir::new().unwrap();
    let capture = write_capture(temp.path());

    // 1. Scan discovers both tools
    margin_cmd(&temp)
        .args(["scan", &capture])
        .assert()
        .success()
        .stdout(predicate::str::contains("tool-a"))
        .stdout(predicate::str::contains("2 tool(s), 0 suggestion(s)"));

    // 2. Suggest on the text tool
    margin_cmd(&temp)
        .args([
            "suggest",
            &capture,
            "--tool",
            "tool-a",
            "--selection",
            "old pier",
            "--text",
            "jetty",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Suggestion added to tool-a"));

    // 3. A fresh scan restores the stored highlight
    margin_cmd(&temp)
        .args(["scan", &capture])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 suggestion(s)"));

    // 4. List shows it
    let output = margin_cmd(&temp)
        .args(["list", "501"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jetty"))
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8(output).unwrap().contains("weave 502 / tool-a"));

    // 5. Delete it through the id reported by export
    margin_cmd(&temp)
        .args(["export", "501", "-o", "out.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote out.json"));
    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("out.json")).unwrap()).unwrap();
    assert_eq!(document["exposition"]["totalSuggestions"], 1);
    let id = document["weaves"]["502"]["tools"][0]["suggestions"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    margin_cmd(&temp)
        .args(["delete", "501", "502", "tool-a", &id])
        .assert()
        .success();

    margin_cmd(&temp)
        .args(["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 suggestion(s)"));
}

#[test]
fn test_save_then_import_into_another_store() {
    let temp = TempDir::new().unwrap();
    let capture = write_capture(temp.path());

    margin_cmd(&temp)
        .args(["save", &capture, "-o", "saved.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote saved.json"));

    let other = TempDir::new().unwrap();
    let saved = temp.path().join("saved.json");
    margin_cmd(&other)
        .args(["import", saved.to_str().unwrap(), "--into", "900"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Merged into exposition 900"));

    margin_cmd(&other)
        .args(["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("900"));
}

#[test]
fn test_read_prints_text_only_listing() {
    let temp = TempDir::new().unwrap();
    let capture = write_capture(temp.path());

    margin_cmd(&temp)
        .args(["read", &capture])
        .assert()
        .success()
        .stdout(predicate::str::contains("Opening"))
        .stdout(predicate::str::contains("Gulls circle the old pier at dawn."));
}

#[test]
fn test_import_rejects_malformed_document() {
    let temp = TempDir::new().unwrap();
    let bad = temp.path().join("bad.json");
    fs::write(&bad, r#"{"weaves": {}}"#).unwrap();

    margin_cmd(&temp)
        .args(["import", bad.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid export document"));
}

#[test]
fn test_delete_unknown_suggestion_fails() {
    let temp = TempDir::new().unwrap();
    let capture = write_capture(temp.path());
    margin_cmd(&temp).args(["scan", &capture]).assert().success();

    margin_cmd(&temp)
        .args(["delete", "501", "502", "tool-a", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Suggestion not found"));
}

#[test]
fn test_config_set_then_get() {
    let temp = TempDir::new().unwrap();

    margin_cmd(&temp)
        .args(["config", "set", "highlight_class", "note"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set highlight_class"));
    assert!(temp.path().join("data").join("margin.toml").exists());

    margin_cmd(&temp)
        .args(["config", "get", "highlight_class"])
        .assert()
        .success()
        .stdout(predicate::str::contains("note"));
}
