// dns-intel/tests/cli_integration.rs

use assert_cmd::Command;
use dns_intel_lib::{HistoryStore, LookupOptions, RecordType};
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Never contacted: every test stops before the request is sent.
const UNUSED_ENDPOINT: &str = "http://127.0.0.1:9/analyze";

/// Command isolated from the user's config, history and DI_* variables.
fn dns_intel(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dns-intel").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("RUST_LOG");
    for key in [
        "DI_ENDPOINT",
        "DNS_API_ENDPOINT",
        "DI_SITE_URL",
        "DI_TOKEN",
        "DI_RECORD_TYPES",
        "DI_TIMEOUT",
        "DI_MAX_RETRIES",
        "DI_RETRY_DELAY",
        "DI_HISTORY_FILE",
        "DI_CONFIG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn history_file(home: &TempDir) -> PathBuf {
    home.path().join("history.json")
}

/// Helper to create a history file with a few entries
fn seed_history(home: &TempDir, domains: &[&str]) -> HistoryStore {
    let store = HistoryStore::new(history_file(home));
    let options = LookupOptions {
        enrichment: true,
        ..Default::default()
    }
    .with_record_types(vec![RecordType::A, RecordType::Mx]);
    for domain in domains {
        store.save(domain, &options).unwrap();
    }
    store
}

#[test]
fn test_help_shows_flags() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--type"))
        .stdout(predicate::str::contains("--propagation"))
        .stdout(predicate::str::contains("--export-json"))
        .stdout(predicate::str::contains("--reminder"))
        .stdout(predicate::str::contains("--clear-history"));
}

#[test]
fn test_no_arguments_is_an_error() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("You must specify a DOMAIN"));
}

#[test]
fn test_domain_and_url_conflict() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .args(["example.com", "--url", "https://dns.example.com/?domain=example.org"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot specify both a DOMAIN and --url"));
}

#[test]
fn test_history_commands_conflict() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .args(["--history", "--clear-history"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot combine history commands"));
}

#[test]
fn test_missing_endpoint() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .args(["example.com", "--token", "tok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API endpoint configured"));
}

#[test]
fn test_invalid_domain_is_rejected() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .args(["example..com", "--endpoint", UNUSED_ENDPOINT, "--token", "tok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("Domain cannot have consecutive dots"));

    assert!(!history_file(&home).exists());
}

#[test]
fn test_missing_token_blocks_lookup() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .args(["example.com", "--endpoint", UNUSED_ENDPOINT])
        .arg("--history-file")
        .arg(history_file(&home))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please complete the Turnstile verification"));

    assert!(!history_file(&home).exists());
}

#[test]
fn test_unknown_record_type() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .args(["example.com", "-t", "A,BOGUS", "--endpoint", UNUSED_ENDPOINT])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown record type 'BOGUS'"));
}

#[test]
fn test_shared_link_without_domain() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .args(["--url", "https://dns.example.com/?tab=ssl"])
        .args(["--endpoint", UNUSED_ENDPOINT, "--token", "tok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("The link has no domain parameter"));
}

#[test]
fn test_shared_link_domain_is_validated() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .args(["--url", "https://dns.example.com/?domain=abc"])
        .args(["--endpoint", UNUSED_ENDPOINT, "--token", "tok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Domain is too short"));
}

#[test]
fn test_endpoint_from_environment() {
    let home = TempDir::new().unwrap();
    // Reaches the token check, so the endpoint was picked up
    dns_intel(&home)
        .arg("example.com")
        .env("DI_ENDPOINT", UNUSED_ENDPOINT)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Turnstile"));
}

#[test]
fn test_invalid_config_file() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("bad.toml");
    fs::write(&config_path, "[api]\nendpoint = \"ftp://api.example.com\"\n").unwrap();

    dns_intel(&home)
        .arg("example.com")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_empty_history() {
    let home = TempDir::new().unwrap();
    dns_intel(&home)
        .arg("--history")
        .arg("--history-file")
        .arg(history_file(&home))
        .assert()
        .success()
        .stdout(predicate::str::contains("No search history yet"));
}

#[test]
fn test_history_lists_recent_first() {
    let home = TempDir::new().unwrap();
    seed_history(&home, &["example.com", "example.org"]);

    let assert = dns_intel(&home)
        .arg("--history")
        .env("DI_HISTORY_FILE", history_file(&home))
        .assert()
        .success()
        .stdout(predicate::str::contains("Search History"))
        .stdout(predicate::str::contains("2 options"));

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let newer = stdout.find("example.org").unwrap();
    let older = stdout.find("example.com").unwrap();
    assert!(newer < older);
}

#[test]
fn test_delete_history_entry() {
    let home = TempDir::new().unwrap();
    let store = seed_history(&home, &["example.com", "example.org"]);

    dns_intel(&home)
        .args(["--delete", "example.com"])
        .arg("--history-file")
        .arg(history_file(&home))
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed example.com"));

    let remaining: Vec<String> = store.list().into_iter().map(|e| e.domain).collect();
    assert_eq!(remaining, vec!["example.org".to_string()]);
}

#[test]
fn test_clear_history_with_yes() {
    let home = TempDir::new().unwrap();
    let store = seed_history(&home, &["example.com"]);

    dns_intel(&home)
        .args(["--clear-history", "--yes"])
        .arg("--history-file")
        .arg(history_file(&home))
        .assert()
        .success()
        .stderr(predicate::str::contains("Search history cleared successfully"));

    assert!(store.list().is_empty());
}

#[test]
fn test_clear_history_needs_confirmation() {
    let home = TempDir::new().unwrap();
    let store = seed_history(&home, &["example.com"]);

    // No terminal to prompt on, so nothing is cleared
    dns_intel(&home)
        .arg("--clear-history")
        .arg("--history-file")
        .arg(history_file(&home))
        .assert()
        .success()
        .stderr(predicate::str::contains("not cleared"));

    assert_eq!(store.list().len(), 1);
}

#[test]
fn test_rerun_unknown_domain() {
    let home = TempDir::new().unwrap();
    seed_history(&home, &["example.com"]);

    dns_intel(&home)
        .args(["--rerun", "example.net", "--endpoint", UNUSED_ENDPOINT, "--token", "tok"])
        .arg("--history-file")
        .arg(history_file(&home))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No history entry for this domain"));
}
