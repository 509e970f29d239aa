//! Offline tests for the selstore binary
//!
//! Every test runs with its own config directory and never reaches a
//! storage service.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn run(args: &[&str], config_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_selstore"))
        .args(args)
        .env("SELSTORE_CONFIG_DIR", config_dir)
        .env_remove("SELSTORE_TEMP_URL_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute selstore")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn with_account(config_dir: &Path) {
    let output = run(
        &[
            "account",
            "set",
            "main",
            "user",
            "hunter2",
            "--auth-url",
            "http://127.0.0.1:9/auth/v1.0",
            "--temp-url-key",
            "secret",
            "--public-url",
            "https://1234.selcdn.ru",
        ],
        config_dir,
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn test_account_lifecycle() {
    let dir = TempDir::new().unwrap();
    with_account(dir.path());

    let output = run(&["account", "list", "--json"], dir.path());
    assert!(output.status.success());
    let list = json(&output);
    let accounts = list["accounts"].as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["name"], "main");
    assert_eq!(accounts[0]["can_sign"], true);
    assert!(!stdout(&output).contains("hunter2"), "keys must not be printed");

    let output = run(&["account", "remove", "main", "--json"], dir.path());
    assert!(output.status.success());
    assert_eq!(json(&output)["success"], true);

    let output = run(&["account", "remove", "main"], dir.path());
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_account_set_rejects_bad_input() {
    let dir = TempDir::new().unwrap();

    let output = run(&["account", "set", "bad/name", "u", "k"], dir.path());
    assert_eq!(output.status.code(), Some(2));

    let output = run(&["account", "set", "main", "u", "k", "--auth-url", "not a url"], dir.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_share_offline() {
    let dir = TempDir::new().unwrap();
    let output = run(
        &[
            "share",
            "main/c/test.txt",
            "--key",
            "secret",
            "--base-url",
            "https://1234.selcdn.ru",
            "--expires-at",
            "1700000000",
        ],
        dir.path(),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout(&output).trim(),
        "https://1234.selcdn.ru/c/test.txt?temp_url_sig=eb1cc3811fb0f8ab1fedf92abdc7696719c2a23c&temp_url_expires=1700000000"
    );
}

#[test]
fn test_share_uses_account_key_and_public_url() {
    let dir = TempDir::new().unwrap();
    with_account(dir.path());

    let output = run(
        &["share", "main/c/test.txt", "--expires-at", "1700000000", "--json"],
        dir.path(),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let value = json(&output);
    assert_eq!(value["expires"], 1_700_000_000);
    assert!(
        value["url"]
            .as_str()
            .unwrap()
            .contains("temp_url_sig=eb1cc3811fb0f8ab1fedf92abdc7696719c2a23c")
    );
}

#[test]
fn test_share_requires_key() {
    let dir = TempDir::new().unwrap();
    let output = run(&["account", "set", "nokey", "u", "k"], dir.path());
    assert!(output.status.success());

    let output = run(&["share", "nokey/c/a.txt", "--base-url", "https://x.test"], dir.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unknown_account() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "a").unwrap();

    let output = run(&["rm", "ghost/c/a.txt"], dir.path());
    assert_eq!(output.status.code(), Some(5));

    let output = run(&["put", file.to_str().unwrap(), "ghost/c/"], dir.path());
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_put_dry_run() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "a").unwrap();

    let output = run(
        &["put", file.to_str().unwrap(), "main/c/docs/", "--dry-run", "--json"],
        dir.path(),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let value = json(&output);
    assert_eq!(value["status"], "dry_run");
    assert_eq!(value["files"][0]["target"], "main/c/docs/a.txt");
}

#[test]
fn test_rm_rejects_mixed_containers() {
    let dir = TempDir::new().unwrap();
    let output = run(&["rm", "main/a/x", "main/b/y"], dir.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_upload_to_unreachable_service() {
    let dir = TempDir::new().unwrap();
    with_account(dir.path());
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "a").unwrap();

    let output = run(
        &["put", file.to_str().unwrap(), "main/c/a.txt", "--no-progress"],
        dir.path(),
    );
    assert_eq!(output.status.code(), Some(3));
}
