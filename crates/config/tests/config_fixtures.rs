//! Integration tests for parsing config fixtures from the workspace testkit.

use fritzbox_config::{
    CURRENT_CONFIG_VERSION, FritzboxEnv, OutputFormat, load_config_from_path, parse_config_json,
    parse_config_toml,
};
use fritzbox_shared::ErrorCode;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture_path(relative: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map_or_else(|| manifest_dir.to_path_buf(), Path::to_path_buf)
        .join("testkit")
        .join("fixtures")
        .join(relative)
}

fn read_fixture(relative: &str) -> Result<String, Box<dyn Error>> {
    Ok(fs::read_to_string(fixture_path(relative))?)
}

#[test]
fn parses_valid_json_fixture_and_normalizes() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/fritzbox-config.valid.json")?;
    let config = parse_config_json(&contents)?;

    assert_eq!(config.version, CURRENT_CONFIG_VERSION);
    assert_eq!(config.device.host, "192.168.178.1", "host should be trimmed");
    assert_eq!(config.device.username, "telegraf");
    assert_eq!(config.device.password.expose(), "fixture-password");
    assert_eq!(config.poll.interval_secs, 30);
    assert_eq!(config.poll.catalog_retry_secs, 120);
    assert_eq!(config.output.format, OutputFormat::Ndjson);
    assert!(config.catalog.snapshot_path.is_some());
    Ok(())
}

#[test]
fn toml_fixture_fills_defaults() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/fritzbox-config.valid.toml")?;
    let config = parse_config_toml(&contents)?;

    assert_eq!(config.device.host, "fritz.box");
    assert_eq!(config.device.port, 49000, "port 0 falls back to the default");
    assert_eq!(config.poll.interval_secs, 15);
    assert_eq!(config.poll.catalog_retry_secs, 60);
    Ok(())
}

#[test]
fn interval_out_of_range_is_rejected() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/fritzbox-config.invalid-interval.json")?;
    let result = parse_config_json(&contents);

    assert!(matches!(
        result,
        Err(ref error) if error.code == ErrorCode::new("config", "invalid_limit")
            && error.metadata.get("max").map(String::as_str) == Some("86400")
    ));
    Ok(())
}

#[test]
fn unknown_fields_fail_with_path_metadata() {
    let path = fixture_path("config/fritzbox-config.unknown-field.toml");
    let result = load_config_from_path(Some(&path), &FritzboxEnv::default());

    assert!(matches!(
        result,
        Err(ref error) if error.code == ErrorCode::new("config", "invalid_toml")
            && error.metadata.contains_key("path")
    ));
}

#[test]
fn loads_toml_fixture_from_path() -> Result<(), Box<dyn Error>> {
    let path = fixture_path("config/fritzbox-config.valid.toml");
    let config = load_config_from_path(Some(&path), &FritzboxEnv::default())?;
    assert_eq!(config.poll.interval_secs, 15);
    Ok(())
}
