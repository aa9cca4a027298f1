// crates/slugmap-cli/tests/mapping_commands.rs
// ============================================================================
// Module: CLI Mapping Command Tests
// Description: Integration tests for the `slugmap` binary.
// Purpose: Ensure mapping commands share state through the configured store
//          and fail with exit code 1.
// Dependencies: slugmap-cli binary
// ============================================================================
//! ## Overview
//! Runs the compiled binary against temporary config files and `SQLite`
//! stores, checking stdout JSON and stderr errors.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn slugmap_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_slugmap"))
}

fn sqlite_config(dir: &TempDir) -> PathBuf {
    let db_path = dir.path().join("data").join("slugmap.db");
    let config_path = dir.path().join("slugmap.toml");
    let config = format!(
        "[store]\ntype = \"sqlite\"\npath = {:?}\n",
        db_path.to_string_lossy().to_string()
    );
    fs::write(&config_path, config).expect("write config");
    config_path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(slugmap_bin())
        .args(args)
        .args(["--config", config.to_string_lossy().as_ref()])
        .env_remove("SLUGMAP_CONFIG")
        .output()
        .expect("run slugmap")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

fn get_id(config: &Path, slug: &str, kind: &str) -> String {
    let output = run(config, &["mapping", "get-id", "--slug", slug, "--type", kind]);
    stdout_json(&output)["uuid"].as_str().expect("uuid").to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn get_id_is_stable_across_invocations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = sqlite_config(&dir);

    let first = get_id(&config, "one-piece", "series");
    let second = get_id(&config, "one-piece", "series");
    let chapter = get_id(&config, "one-piece", "chapter");
    assert_eq!(first, second);
    assert_ne!(first, chapter);

    let record = stdout_json(&run(&config, &["mapping", "resolve", &first]));
    assert_eq!(record["uuid"], first.as_str());
    assert_eq!(record["slug"], "one-piece");
    assert_eq!(record["type"], "series");
}

#[test]
fn resolve_unknown_identifier_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = sqlite_config(&dir);
    let output =
        run(&config, &["mapping", "resolve", "00000000-0000-0000-0000-000000000000"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("mapping not found"));
}

#[test]
fn get_id_rejects_empty_slug() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = sqlite_config(&dir);
    let output = run(&config, &["mapping", "get-id", "--slug", "", "--type", "series"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("mapping get-id failed"));
}

#[test]
fn list_pages_through_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = sqlite_config(&dir);
    let ids: Vec<String> =
        ["a", "b", "c"].iter().map(|slug| get_id(&config, slug, "series")).collect();

    let page = stdout_json(&run(&config, &["mapping", "list", "--limit", "2"]));
    let mappings = page["mappings"].as_array().expect("mappings");
    assert_eq!(mappings.len(), 2);
    assert_eq!(mappings[0]["uuid"], ids[0].as_str());
    assert!(mappings[0]["created_at_ms"].is_i64());
    let cursor = page["next_after"].as_str().expect("cursor").to_string();
    assert_eq!(cursor, ids[1]);

    let rest = stdout_json(&run(&config, &["mapping", "list", "--limit", "2", "--after", &cursor]));
    let mappings = rest["mappings"].as_array().expect("mappings");
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0]["uuid"], ids[2].as_str());
    assert!(rest["next_after"].is_null());

    let text = run(&config, &["mapping", "list", "--format", "text"]);
    assert!(text.status.success());
    assert_eq!(String::from_utf8_lossy(&text.stdout).lines().count(), 3);
}

#[test]
fn list_requires_sqlite_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("slugmap.toml");
    fs::write(&config, "[store]\ntype = \"memory\"\n").expect("write config");
    let output = run(&config, &["mapping", "list"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("requires a sqlite store"));
}

#[test]
fn health_reports_connected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = sqlite_config(&dir);
    let health = stdout_json(&run(&config, &["mapping", "health"]));
    assert_eq!(health["status"], "OK");
    assert_eq!(health["database"], "Connected");
}

#[test]
fn config_validate_reports_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = sqlite_config(&dir);
    let output = run(&good, &["config", "validate"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "config ok");

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[store]\ntype = \"sqlite\"\n").expect("write config");
    let output = run(&bad, &["config", "validate"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("config load failed"));

    let missing = dir.path().join("missing.toml");
    let output = run(&missing, &["config", "validate"]);
    assert_eq!(output.status.code(), Some(1));
}
