use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn setup() -> TempDir {
    let temp = TempDir::new().unwrap();
    let conn = rusqlite::Connection::open(temp.path().join("records.db")).unwrap();
    conn.execute_batch(
        "CREATE TABLE groups (id TEXT PRIMARY KEY, name TEXT, kind TEXT, member_count INTEGER);
         INSERT INTO groups VALUES ('g1', 'services', 'org', 3);
         INSERT INTO groups VALUES ('g2', 'platform', 'team', 5);",
    )
    .unwrap();
    temp
}

fn crud(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("crud-audit").unwrap();
    cmd.env("CRUD_AUDIT_DATA_DIR", temp.path()).env_remove("CRUD_AUDIT_USER");
    cmd
}

#[test]
fn config_writes_settings_file() {
    let temp = TempDir::new().unwrap();
    crud(&temp)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("maxQueryLimit"));
    assert!(temp.path().join("config.json").exists());
}

#[test]
fn get_by_filter_prints_envelope() {
    let temp = setup();
    crud(&temp)
        .args(["get", "--table", "groups", "--filter", r#"{"name": "services"}"#, "--limit", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"code\": \"success\""))
        .stdout(predicate::str::contains("\"totalRecordsCount\": 1"))
        .stdout(predicate::str::contains("\"memberCount\": 3"));
}

#[test]
fn get_reports_stats_under_value() {
    let temp = setup();
    let output = crud(&temp)
        .args(["get", "-t", "groups", "--skip", "1", "--limit", "10"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["value"]["stats"]["skip"], 1);
    assert_eq!(envelope["value"]["stats"]["limit"], 10);
    assert_eq!(envelope["value"]["stats"]["totalRecordsCount"], 2);
}

#[test]
fn missing_access_table_prints_envelope() {
    let temp = setup();
    std::fs::write(temp.path().join("config.json"), r#"{"checkAccess": true}"#).unwrap();

    crud(&temp)
        .args(["get", "-t", "groups", "-u", "u-1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"code\": \"readError\""));
}

#[test]
fn save_then_audit_recent() {
    let temp = setup();
    crud(&temp)
        .args(["save", "--table", "groups", "--user", "u-1", r#"{"name": "research", "kind": "team"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 record(s) created"));

    crud(&temp)
        .args(["audit", "recent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE groups by u-1"));
}

#[test]
fn update_by_id_changes_row() {
    let temp = setup();
    crud(&temp)
        .args(["save", "-t", "groups", "-u", "u-1", r#"{"id": "g2", "memberCount": 6}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 record(s) updated"));

    crud(&temp)
        .args(["get", "-t", "groups", "--id", "g2", "--project", "memberCount"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"memberCount\": 6"));
}

#[test]
fn unrestricted_delete_fails() {
    let temp = setup();
    crud(&temp)
        .args(["delete", "--table", "groups", "--user", "u-1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("paramsError"));
}

#[test]
fn audited_write_without_user_fails() {
    let temp = setup();
    crud(&temp)
        .args(["delete", "--table", "groups", "--id", "g1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("userId is required"));
}
