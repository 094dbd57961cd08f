use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(ext: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/samples")
        .join(format!("sample.{ext}"))
}

/// A converter command isolated from any user config file.
fn tool(name: &str, dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin(name).unwrap();
    cmd.env("DBTOOLS_CONFIG", dir.join("missing.toml"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_common_flags() {
    let dir = tempfile::tempdir().unwrap();
    tool("ccsv2mongo", dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--file"))
        .stdout(predicate::str::contains("--ignore-ext"))
        .stdout(predicate::str::contains("--no-mongo-types"));
}

#[test]
fn version_flag() {
    let dir = tempfile::tempdir().unwrap();
    tool("csql2csv", dir.path())
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_required_flags_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    tool("ccsv2sql", dir.path())
        .args(["-f", "x.csv"])
        .assert()
        .code(2);
}

#[test]
fn csv_to_mongo_array_with_tz() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.json");
    tool("ccsv2mongo", dir.path())
        .arg("-f")
        .arg(fixture("csv"))
        .arg("-o")
        .arg(&out)
        .args(["-a", "-t"])
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with('['));
    assert!(text.trim_end().ends_with(']'));
    assert!(text.contains(r#"{"$oid":"56a3a8c6ef2a4f6c1a000001"}"#));
    assert!(text.contains("Z\"}"));
}

#[test]
fn csv_to_sql_verbose() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.sql");
    tool("ccsv2sql", dir.path())
        .arg("-f")
        .arg(fixture("csv"))
        .arg("-o")
        .arg(&out)
        .args(["-l", "-d", "shop", "--table", "items"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generating SQL dump file: '"))
        .stdout(predicate::str::contains("CSV file: '"));

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("USE `shop`;"));
    assert!(text.contains("CREATE TABLE IF NOT EXISTS `items` ("));
}

#[test]
fn mongo_to_csv_custom_separator() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");
    tool("cmongo2csv", dir.path())
        .arg("-f")
        .arg(fixture("json"))
        .arg("-o")
        .arg(&out)
        .args(["-s", ";", "-n"])
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("_id;name;price;in_stock;created;tags\n"));
    assert!(!text.contains("ObjectId("));
}

#[test]
fn mongo_to_sql_without_comments() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.sql");
    tool("cmongo2sql", dir.path())
        .arg("-f")
        .arg(fixture("json"))
        .arg("-o")
        .arg(&out)
        .arg("-n")
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("DROP TABLE IF EXISTS `sample`;"));
}

#[test]
fn sql_to_csv_is_plain() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");
    tool("csql2csv", dir.path())
        .arg("-f")
        .arg(fixture("sql"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("id,name,price,in_stock,created\n"));
    assert!(text.contains(",Gadget; boxed,"));
    assert!(!text.contains("%!s(bool="));
}

#[test]
fn sql_to_mongo_unknown_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    tool("csql2mongo", dir.path())
        .arg("-f")
        .arg(fixture("sql"))
        .arg("-o")
        .arg(dir.path().join("out.json"))
        .args(["--table", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'nope' not found"));
}

#[test]
fn wrong_extension_fails_unless_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    tool("csql2mongo", dir.path())
        .arg("-f")
        .arg(fixture("sql"))
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not JSON"));
    assert!(!out.exists());

    tool("csql2mongo", dir.path())
        .arg("-f")
        .arg(fixture("sql"))
        .arg("-o")
        .arg(&out)
        .arg("-i")
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&out).unwrap().lines().count(), 3);
}

fn first_line(path: &Path) -> String {
    let text = std::fs::read_to_string(path).unwrap();
    text.lines().next().unwrap_or_default().to_string()
}

#[test]
fn config_file_sets_defaults_and_flags_override_it() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("dbtools.toml");
    std::fs::write(&config, "[defaults]\nseparator = \";\"\n").unwrap();
    let out = dir.path().join("out.csv");

    tool("cmongo2csv", dir.path())
        .env("DBTOOLS_CONFIG", &config)
        .arg("-f")
        .arg(fixture("json"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success();
    assert_eq!(first_line(&out), "_id;name;price;in_stock;created;tags");

    tool("cmongo2csv", dir.path())
        .env("DBTOOLS_CONFIG", &config)
        .arg("-f")
        .arg(fixture("json"))
        .arg("-o")
        .arg(&out)
        .args(["-s", ","])
        .assert()
        .success();
    assert_eq!(first_line(&out), "_id,name,price,in_stock,created,tags");
}

#[test]
fn config_flag_takes_an_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[defaults]\nseparator = \"|\"\nmongo_types = false\n").unwrap();
    let out = dir.path().join("out.csv");

    tool("cmongo2csv", dir.path())
        .arg("-f")
        .arg(fixture("json"))
        .arg("-o")
        .arg(&out)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    assert_eq!(first_line(&out), "_id|name|price|in_stock|created|tags");
    assert!(!std::fs::read_to_string(&out).unwrap().contains("ObjectId("));
}

#[test]
fn invalid_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("broken.toml");
    std::fs::write(&config, "[defaults\n").unwrap();

    tool("csql2csv", dir.path())
        .arg("-f")
        .arg(fixture("sql"))
        .arg("-o")
        .arg(dir.path().join("out.csv"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config error"));
}
