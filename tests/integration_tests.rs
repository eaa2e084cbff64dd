//! Integration tests for the blueprints CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get a blueprints command bound to a database inside `tmp`
fn blueprints(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("blueprints").unwrap();
    cmd.current_dir(tmp.path())
        .env_remove("RUST_LOG")
        .env_remove("BLUEPRINTS_DATABASE")
        .env_remove("BLUEPRINTS_DIRECTORY")
        .env_remove("BLUEPRINTS_LOG")
        .args(["--database", "test.db"]);
    cmd
}

/// Helper to write a blueprint document and return its path
fn write_blueprint(dir: &Path, file: &str, name: &str, template: &str) -> String {
    let document = serde_json::json!({
        "name": name,
        "connectionType": "CLI",
        "vendorPattern": "Vendor",
        "template": template,
    });
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, document.to_string()).unwrap();
    path.to_string_lossy().to_string()
}

/// Helper to create a blueprint and return its ID
fn create_blueprint(tmp: &TempDir, name: &str) -> String {
    let file = write_blueprint(tmp.path(), &format!("{name}.json"), name, "{}");
    let output = blueprints(tmp)
        .args(["--quiet", "create", &file])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    blueprints(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("blueprint registry"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    blueprints(&tmp).arg("frobnicate").assert().failure();
}

// ============================================================================
// Create / Show
// ============================================================================

#[test]
fn test_create_and_show() {
    let tmp = TempDir::new().unwrap();
    let file = write_blueprint(
        tmp.path(),
        "cli.json",
        "cli",
        r#"{"host": "{{<STRING> host}}", "port": "{{<NUMBER> port}}"}"#,
    );

    blueprints(&tmp)
        .args(["create", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created blueprint blueprint/1"));

    assert!(tmp.path().join("test.db").exists());

    blueprints(&tmp)
        .args(["--format", "json", "show", "blueprint/1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id": "blueprint/1""#))
        .stdout(predicate::str::contains(r#""name": "cli""#))
        .stdout(predicate::str::contains(r#""status": "ACTIVE""#));
}

#[test]
fn test_create_duplicate_name_fails() {
    let tmp = TempDir::new().unwrap();
    create_blueprint(&tmp, "cli");

    let file = write_blueprint(tmp.path(), "again.json", "cli", "{}");
    blueprints(&tmp)
        .args(["create", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_create_with_unsupported_variable_type_fails() {
    let tmp = TempDir::new().unwrap();
    let file = write_blueprint(tmp.path(), "bad.json", "bad", r#"{"port": "{{<PORT> port}}"}"#);

    blueprints(&tmp)
        .args(["create", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported variable type 'PORT'"));

    blueprints(&tmp)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No blueprints found"));
}

#[test]
fn test_show_unknown_id_fails() {
    let tmp = TempDir::new().unwrap();
    for id in ["blueprint/9", "not-an-id"] {
        blueprints(&tmp)
            .args(["show", id])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does not exist"));
    }
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn test_update_changes_and_no_op() {
    let tmp = TempDir::new().unwrap();
    let id = create_blueprint(&tmp, "gnmi");
    assert_eq!(id, "blueprint/1");

    // same content as stored
    let same = write_blueprint(tmp.path(), "same.json", "gnmi", "{}");
    blueprints(&tmp)
        .args(["--quiet", "update", &id, &same])
        .assert()
        .success()
        .stdout("unchanged\n");

    let changed = write_blueprint(tmp.path(), "changed.json", "gnmi", r#"{"on": "{{<BOOLEAN> on}}"}"#);
    blueprints(&tmp)
        .args(["update", &id, &changed])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated blueprint blueprint/1"));

    blueprints(&tmp)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("{{<BOOLEAN> on}}"));
}

#[test]
fn test_update_name_change_fails() {
    let tmp = TempDir::new().unwrap();
    let id = create_blueprint(&tmp, "cli");

    let renamed = write_blueprint(tmp.path(), "renamed.json", "other", "{}");
    blueprints(&tmp)
        .args(["update", &id, &renamed])
        .assert()
        .failure()
        .stderr(predicate::str::contains("name cannot be changed"));
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_delete_archives_and_frees_name() {
    let tmp = TempDir::new().unwrap();
    let id = create_blueprint(&tmp, "test");

    blueprints(&tmp)
        .args(["--format", "json", "delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "test""#));

    blueprints(&tmp)
        .args(["--format", "json", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "DELETED""#))
        .stdout(predicate::str::is_match(r#""name": "test__\d+""#).unwrap());

    // deleted blueprints are terminal
    blueprints(&tmp)
        .args(["delete", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be deleted"));

    // the original name can be reused
    let again = create_blueprint(&tmp, "test");
    assert_eq!(again, "blueprint/2");
}

// ============================================================================
// List
// ============================================================================

#[test]
fn test_list_hides_deleted_by_default() {
    let tmp = TempDir::new().unwrap();
    create_blueprint(&tmp, "cli");
    let gnmi = create_blueprint(&tmp, "gnmi");
    blueprints(&tmp).args(["delete", &gnmi]).assert().success();

    blueprints(&tmp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("cli"))
        .stdout(predicate::str::contains("gnmi").not())
        .stdout(predicate::str::contains("1 blueprint(s) found"));

    blueprints(&tmp)
        .args(["list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gnmi__"))
        .stdout(predicate::str::contains("DELETED"));
}

#[test]
fn test_list_filter_by_connection_type() {
    let tmp = TempDir::new().unwrap();
    create_blueprint(&tmp, "cli");

    blueprints(&tmp)
        .args(["list", "--connection-type", "snmp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No blueprints found"));
}

// ============================================================================
// Load
// ============================================================================

#[test]
fn test_load_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("blueprints");
    write_blueprint(&dir, "cli.json", "cli", "{}");
    write_blueprint(&dir, "vendor/gnmi.json", "gnmi", r#"{"secret": "{{<SECRET> token}}"}"#);

    // default directory comes from config
    blueprints(&tmp)
        .arg("load")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 2 file(s)"))
        .stdout(predicate::str::contains("2 created"));

    blueprints(&tmp)
        .args(["--format", "json", "load", "blueprints"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""unchanged": 2"#));
}

#[test]
fn test_load_rolls_back_on_invalid_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("defs");
    write_blueprint(&dir, "a.json", "a", "{}");
    write_blueprint(&dir, "b.json", "b", "[1, 2]");

    blueprints(&tmp)
        .args(["load", "defs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("b.json"));

    blueprints(&tmp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No blueprints found"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_templates() {
    let tmp = TempDir::new().unwrap();
    let good = tmp.path().join("good.json");
    let bad = tmp.path().join("bad.json");
    fs::write(&good, r#"{"a": {"b": ["{{<STRING> x}}"]}}"#).unwrap();
    fs::write(&bad, r#"{"a": {"b": {"c": "{{<UNSUPPORTED> x}}"}}}"#).unwrap();

    blueprints(&tmp)
        .args(["validate", "good.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 template(s) valid"));

    blueprints(&tmp)
        .args(["validate", "good.json", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("UNSUPPORTED"))
        .stderr(predicate::str::contains("1 of 2 template(s) failed validation"));

    // no database is created by validation
    assert!(!tmp.path().join("test.db").exists());
}

#[test]
fn test_validate_blueprint_documents() {
    let tmp = TempDir::new().unwrap();
    write_blueprint(tmp.path(), "doc.json", "doc", r#"{"x": "{{<number> n}}"}"#);

    blueprints(&tmp)
        .args(["--format", "json", "validate", "--document", "doc.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""valid": true"#));
}
