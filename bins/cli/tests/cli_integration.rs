//! CLI integration tests.

use fritzbox_testkit::fixture_path;
use std::process::{Command, Output};

fn run_cli(args: &[&str], env: &[(&str, &str)]) -> std::io::Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fritzbox-collector"));
    command.args(args);
    scrub_scoped_env(&mut command);
    command.env_remove("RUST_LOG");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output()
}

fn scrub_scoped_env(command: &mut Command) {
    for (key, _) in std::env::vars() {
        if key.starts_with("FRITZBOX_") {
            command.env_remove(key);
        }
    }
}

fn snapshot_path() -> String {
    fixture_path("catalog/fritzbox-7590.json")
        .to_string_lossy()
        .to_string()
}

fn fixture_arg(relative: &str) -> String {
    fixture_path(relative).to_string_lossy().to_string()
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn info_reports_name_and_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let output = run_cli(&["--output", "json", "info"], &[])?;
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        value.pointer("/build/name"),
        Some(&serde_json::Value::from("fritzbox-collector"))
    );
    assert_eq!(
        value.pointer("/build/defaults/port"),
        Some(&serde_json::Value::from(49000))
    );
    Ok(())
}

#[test]
fn metrics_json_lists_the_default_table() -> Result<(), Box<dyn std::error::Error>> {
    let output = run_cli(&["--output", "json", "metrics"], &[])?;
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let simple = value
        .pointer("/metrics/simple")
        .and_then(serde_json::Value::as_array)
        .map(Vec::len);
    assert_eq!(simple, Some(7));
    Ok(())
}

#[test]
fn config_sample_is_printed() -> Result<(), Box<dyn std::error::Error>> {
    let output = run_cli(&["config", "sample"], &[])?;
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), fritzbox_config::sample_config());
    Ok(())
}

#[test]
fn config_check_accepts_valid_file() -> Result<(), Box<dyn std::error::Error>> {
    let path = fixture_arg("config/fritzbox-config.valid.toml");
    let output = run_cli(&["config", "check", "--path", &path], &[])?;
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert!(stdout_of(&output).contains("config: ok"));
    Ok(())
}

#[test]
fn config_check_rejects_out_of_range_interval() -> Result<(), Box<dyn std::error::Error>> {
    let path = fixture_arg("config/fritzbox-config.invalid-interval.json");
    let output = run_cli(&["config", "check", "--path", &path], &[])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("config:invalid_limit"));
    assert!(stdout_of(&output).is_empty());
    Ok(())
}

#[test]
fn config_show_redacts_password() -> Result<(), Box<dyn std::error::Error>> {
    let path = fixture_arg("config/fritzbox-config.valid.json");
    let output = run_cli(
        &["config", "show", "--path", &path],
        &[("FRITZBOX_PASSWORD", "env-secret")],
    )?;
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(!stdout.contains("fixture-password"));
    assert!(!stdout.contains("env-secret"));
    assert!(stdout.contains("[REDACTED]"));
    Ok(())
}

#[test]
fn gather_writes_line_protocol_to_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = snapshot_path();
    let output = run_cli(
        &["--no-progress", "gather"],
        &[("FRITZBOX_CATALOG_SNAPSHOT", snapshot.as_str())],
    )?;
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().any(|line| line.starts_with("fritzbox,fritzbox=fritz.box ")));
    assert!(lines.iter().all(|line| !line.starts_with("info:")));
    Ok(())
}

#[test]
fn gather_ndjson_records_parse_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = snapshot_path();
    let output = run_cli(
        &["--no-progress", "gather", "--format", "ndjson"],
        &[("FRITZBOX_CATALOG_SNAPSHOT", snapshot.as_str())],
    )?;
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    let mut count = 0;
    for line in stdout.lines() {
        let _: serde_json::Value = serde_json::from_str(line)?;
        count += 1;
    }
    assert_eq!(count, 4);
    Ok(())
}

#[test]
fn gather_summary_goes_to_stderr_in_json_mode() -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = snapshot_path();
    let output = run_cli(
        &["--output", "json", "gather"],
        &[("FRITZBOX_CATALOG_SNAPSHOT", snapshot.as_str())],
    )?;
    assert!(output.status.success());
    let stderr = stderr_of(&output);
    let summary = stderr
        .lines()
        .find(|line| line.contains("\"type\":\"summary\""))
        .ok_or("missing summary line")?;
    let value: serde_json::Value = serde_json::from_str(summary)?;
    assert_eq!(
        value.pointer("/summary/recordsEmitted"),
        Some(&serde_json::Value::from(4))
    );
    Ok(())
}

#[test]
fn gather_without_catalog_source_is_invalid_input() -> Result<(), Box<dyn std::error::Error>> {
    let output = run_cli(&["gather"], &[])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("config:missing_catalog_source"));
    assert!(stdout_of(&output).is_empty());
    Ok(())
}

#[test]
fn gather_with_missing_snapshot_is_unavailable() -> Result<(), Box<dyn std::error::Error>> {
    let output = run_cli(
        &["gather"],
        &[("FRITZBOX_CATALOG_SNAPSHOT", "/nonexistent/fritzbox-catalog.json")],
    )?;
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr_of(&output).contains("gather:catalog_unavailable"));
    Ok(())
}

#[test]
fn gather_rejects_invalid_env_port() -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = snapshot_path();
    let output = run_cli(
        &["gather"],
        &[
            ("FRITZBOX_CATALOG_SNAPSHOT", snapshot.as_str()),
            ("FRITZBOX_PORT", "not-a-port"),
        ],
    )?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout_of(&output).is_empty());
    Ok(())
}

#[test]
fn watch_stops_after_count_polls() -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = snapshot_path();
    let output = run_cli(
        &["--output", "json", "watch", "--count", "2"],
        &[
            ("FRITZBOX_CATALOG_SNAPSHOT", snapshot.as_str()),
            ("FRITZBOX_POLL_INTERVAL_SECS", "1"),
        ],
    )?;
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output).lines().count(), 8);

    let stderr = stderr_of(&output);
    let summary = stderr
        .lines()
        .find(|line| line.contains("\"type\":\"summary\""))
        .ok_or("missing summary line")?;
    let value: serde_json::Value = serde_json::from_str(summary)?;
    assert_eq!(value.pointer("/summary/polls"), Some(&serde_json::Value::from(2)));
    assert_eq!(
        value.pointer("/summary/recordsEmitted"),
        Some(&serde_json::Value::from(8))
    );
    Ok(())
}
