//! End-to-end tests of the `mysql-utils` binary against SQLite.

use assert_cmd::Command;
use std::io::Write;
use tempfile::NamedTempFile;

fn mysql_utils() -> Command {
    let mut cmd = Command::cargo_bin("mysql-utils").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_statements_run_in_order() {
    mysql_utils()
        .args([
            "--sqlite",
            ":memory:",
            "CREATE TABLE unittest (col1 INT, col2 TEXT)",
            "INSERT INTO unittest VALUES (10, 'col1'), (20, 'col2'), (30, 'col3')",
            "SELECT col1, col2 FROM unittest",
        ])
        .assert()
        .success()
        .stdout("0 row(s) affected\n3 row(s) affected\ncol1\tcol2\n10\tcol1\n20\tcol2\n30\tcol3\n");
}

#[test]
fn test_json_output() {
    mysql_utils()
        .args([
            "--sqlite",
            ":memory:",
            "--json",
            "SELECT 1 AS id, 'it''s' AS name, NULL AS missing",
        ])
        .assert()
        .success()
        .stdout("{\"id\":1,\"missing\":null,\"name\":\"it's\"}\n");
}

#[test]
fn test_config_file_selects_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cli.db");
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[sqlite]\npath = {:?}", db_path.display().to_string()).unwrap();

    mysql_utils()
        .arg("--config")
        .arg(config.path())
        .args(["CREATE TABLE t (a INT)", "INSERT INTO t VALUES (7)"])
        .assert()
        .success();

    mysql_utils()
        .arg("--config")
        .arg(config.path())
        .arg("SELECT a FROM t")
        .assert()
        .success()
        .stdout("a\n7\n");
}

#[test]
fn test_usage_error_exit_code() {
    mysql_utils().assert().code(2);
    mysql_utils().args(["--bogus", "SELECT 1"]).assert().code(2);
}

#[test]
fn test_query_error_exit_code() {
    mysql_utils()
        .args(["--sqlite", ":memory:", "SELECT * FROM nonexistent_table"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_config_file() {
    mysql_utils()
        .args(["--config", "/nonexistent/mysql-utils.toml", "SELECT 1"])
        .assert()
        .code(1);
}
