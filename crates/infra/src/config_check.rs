//! Config loading helpers for CLI surfaces.

use crate::InfraResult;
use fritzbox_config::{
    FritzboxEnv, ValidatedFritzboxConfig, load_config_from_path, to_pretty_json, to_pretty_toml,
};
use fritzbox_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

/// Load and validate the effective config from an env map and optional file.
pub fn check_config(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
) -> InfraResult<ValidatedFritzboxConfig> {
    let env = FritzboxEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    load_config_from_path(config_path, &env)
}

/// Load and validate the effective config, returning deterministic pretty JSON.
pub fn load_effective_config_json(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
) -> InfraResult<String> {
    let config = check_config(env, config_path)?;
    to_pretty_json(config.as_ref())
}

/// Load and validate the effective config, returning deterministic pretty TOML.
pub fn load_effective_config_toml(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
) -> InfraResult<String> {
    let config = check_config(env, config_path)?;
    to_pretty_toml(config.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritzbox_shared::REDACTED;
    use fritzbox_testkit::fixture_path;
    use serde_json::Value;

    #[test]
    fn effective_json_applies_env_over_file() -> Result<(), Box<dyn std::error::Error>> {
        let path = fixture_path("config/fritzbox-config.valid.json");
        let mut env = BTreeMap::new();
        env.insert("FRITZBOX_HOST".to_string(), "192.168.178.1".to_string());
        env.insert("FRITZBOX_PASSWORD".to_string(), "hunter2".to_string());

        let output = load_effective_config_json(&env, Some(&path))?;
        let value: Value = serde_json::from_str(&output)?;
        assert_eq!(value.pointer("/device/host"), Some(&Value::from("192.168.178.1")));
        assert_eq!(value.pointer("/device/password"), Some(&Value::from(REDACTED)));
        assert!(!output.contains("hunter2"));
        Ok(())
    }

    #[test]
    fn effective_toml_uses_defaults_without_file() -> Result<(), Box<dyn std::error::Error>> {
        let output = load_effective_config_toml(&BTreeMap::new(), None)?;
        assert!(output.contains("host = \"fritz.box\""));
        assert!(output.contains("port = 49000"));
        Ok(())
    }

    #[test]
    fn invalid_file_is_reported() {
        let path = fixture_path("config/fritzbox-config.invalid-interval.json");
        assert!(check_config(&BTreeMap::new(), Some(&path)).is_err());
    }
}
