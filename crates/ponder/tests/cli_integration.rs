//! CLI integration tests for the Ponder command-line interface.
//!
//! These tests cover help output, argument parsing, config discovery and
//! the errors reported before any model server is contacted.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A ponder command isolated from the user's config, tokenizer and cwd.
fn ponder(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ponder").unwrap();
    cmd.env("PONDER_CONFIG_DIR", home.path())
        .env_remove("PONDER_CONFIG")
        .env_remove("PONDER_TOKENIZER")
        .current_dir(home.path());
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("thinking-budget"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ponder"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("budget"))
        .stdout(predicate::str::contains("sample"))
        .stdout(predicate::str::contains("agent"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_budget_help_lists_flags() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .args(["budget", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--budget"))
        .stdout(predicate::str::contains("--max-rounds"))
        .stdout(predicate::str::contains("--tokenizer"))
        .stdout(predicate::str::contains("--no-save"));
}

#[test]
fn test_agent_requires_query() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .arg("agent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<QUERY>"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    let home = TempDir::new().unwrap();
    ponder(&home).arg("bogus").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Flag Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag_accepted() {
    let home = TempDir::new().unwrap();
    ponder(&home).args(["--verbose", "--help"]).assert().success();
}

#[test]
fn test_budget_rejects_non_numeric_budget() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .args(["budget", "--budget", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_uses_config_dir() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            home.path().join("config.toml").display().to_string(),
        ))
        .stdout(predicate::str::contains("ponder.toml"));
}

#[test]
fn test_config_init_then_which() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(home.path().join("config.toml").is_file());

    ponder(&home)
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 config file(s) loaded."));
}

#[test]
fn test_config_show_reads_project_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("ponder.toml"),
        "[budget]\nbudget = 777\n",
    )
    .unwrap();
    ponder(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("777"));
}

#[test]
fn test_plaintext_key_warns() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("ponder.toml"),
        "[agent]\napi_key = \"sk-plain\"\n",
    )
    .unwrap();
    ponder(&home)
        .args(["config", "which"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning:"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .args(["--config", "does-not-exist.toml", "config", "show"])
        .assert()
        .failure();
}

#[test]
fn test_zero_budget_in_config_rejected() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("bad.toml");
    std::fs::write(&file, "[budget]\nbudget = 0\n").unwrap();
    ponder(&home)
        .arg("--config")
        .arg(&file)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("budget"));
}

#[test]
fn test_zero_budget_in_project_file_is_warning() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("ponder.toml"), "[budget]\nbudget = 0\n").unwrap();
    ponder(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stderr(predicate::str::contains("budget.budget"))
        .stdout(predicate::str::contains("32768"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Run Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_budget_without_tokenizer_fails() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .args(["budget", "What is 1+1?", "--budget", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tokenizer"));
}

#[test]
fn test_sample_with_missing_tokenizer_file_fails() {
    let home = TempDir::new().unwrap();
    ponder(&home)
        .args(["sample", "hi", "--tokenizer", "no/such/tokenizer.json"])
        .assert()
        .failure();
}
