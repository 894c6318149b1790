use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn write_files(dir: &TempDir) {
    fs::write(dir.path().join("setup.exe"), b"hello world").expect("write exe");
    fs::write(dir.path().join("notes.txt"), b"notes").expect("write txt");
    fs::create_dir_all(dir.path().join("lib")).expect("create lib");
    fs::write(dir.path().join("lib/core.dll"), b"core").expect("write dll");
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("epo-reputation");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("hashes_per_request = 100"));
    assert!(content.contains("password_env = \"EPO_PASSWORD\""));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# mine").expect("write config");

    let mut cmd = cargo_bin_cmd!("epo-reputation");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn hash_outputs_wire_records_as_json() {
    let work = TempDir::new().expect("temp dir");
    let files = TempDir::new().expect("temp dir");
    write_files(&files);

    let mut cmd = cargo_bin_cmd!("epo-reputation");
    let output = cmd
        .current_dir(work.path())
        .args(["hash", "--file-types", "exe", "--reputation", "unknown", "--json"])
        .arg(files.path())
        .output()
        .expect("run hash");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let records = value.as_array().expect("array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "setup.exe");
    assert_eq!(records[0]["md5"], "XrY7u+Ae7tCTyyK7j1rNww==");
    assert_eq!(records[0]["reputation"], "50");
    assert!(
        records[0]["comment"]
            .as_str()
            .expect("comment")
            .ends_with("@WebAPI")
    );
}

#[test]
fn export_writes_semicolon_csv() {
    let work = TempDir::new().expect("temp dir");
    let files = TempDir::new().expect("temp dir");
    write_files(&files);
    let out = work.path().join("hashes.csv");

    let mut cmd = cargo_bin_cmd!("epo-reputation");
    cmd.current_dir(work.path())
        .args(["export", "--file-types", "exe+dll", "--output"])
        .arg(&out)
        .arg(files.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 record(s)"));

    let content = fs::read_to_string(&out).expect("read export");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "filename;comment;md5 hash;sha1 hash;reputation");
    assert_eq!(lines.len(), 3);
    assert!(content.contains("5eb63bbbe01eeed093cb22bb8f5acdc3"));
}

#[test]
fn send_dry_run_chunks_without_network() {
    let work = TempDir::new().expect("temp dir");
    let files = TempDir::new().expect("temp dir");
    write_files(&files);

    let mut cmd = cargo_bin_cmd!("epo-reputation");
    cmd.current_dir(work.path())
        .args(["send", "--dry-run", "--file-types", "all", "--chunk-size", "2"])
        .arg(files.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Submitted 3 hash(es) in 2 request(s)"))
        .stdout(predicate::str::contains("[DRY RUN] 2 request(s)"));
}

#[test]
fn send_without_url_fails_before_network() {
    let work = TempDir::new().expect("temp dir");
    let files = TempDir::new().expect("temp dir");
    write_files(&files);

    let mut cmd = cargo_bin_cmd!("epo-reputation");
    cmd.current_dir(work.path())
        .env_remove("EPO_REPUTATION__EPO__URL")
        .arg("send")
        .arg(files.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No ePO URL configured"));
}

#[test]
fn hash_missing_directory_fails() {
    let work = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("epo-reputation");
    cmd.current_dir(work.path())
        .args(["hash"])
        .arg(work.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory not found"));
}

#[test]
fn send_unknown_reputation_warns_once() {
    let work = TempDir::new().expect("temp dir");
    let files = TempDir::new().expect("temp dir");
    write_files(&files);

    let mut cmd = cargo_bin_cmd!("epo-reputation");
    let output = cmd
        .current_dir(work.path())
        .args(["send", "--dry-run", "--reputation", "very good"])
        .arg(files.path())
        .output()
        .expect("run send");

    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Using default reputation").count(), 1);
}

#[test]
fn hash_and_export_reject_missing_config_file() {
    let work = TempDir::new().expect("temp dir");
    let files = TempDir::new().expect("temp dir");
    write_files(&files);
    let missing = work.path().join("missing.toml");

    for command in ["hash", "export"] {
        let mut cmd = cargo_bin_cmd!("epo-reputation");
        cmd.current_dir(work.path())
            .arg(command)
            .arg("--config")
            .arg(&missing)
            .arg(files.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Config file not found"));
    }

    assert!(fs::read_dir(work.path()).expect("read work dir").next().is_none());
}
