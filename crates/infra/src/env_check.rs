//! Environment validation helpers for CLI surfaces.

use fritzbox_config::{FritzboxConfig, FritzboxEnv, apply_env_overrides};
use fritzbox_shared::ErrorEnvelope;
use std::collections::BTreeMap;

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Validate that the provided env overrides parse and merge into a valid config.
pub fn validate_env_parsing(env: &BTreeMap<String, String>) -> InfraResult<()> {
    let parsed = FritzboxEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    let _ = apply_env_overrides(FritzboxConfig::default(), &parsed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritzbox_shared::ErrorCode;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn empty_env_is_valid() {
        assert!(validate_env_parsing(&BTreeMap::new()).is_ok());
    }

    #[test]
    fn overrides_are_validated_after_merge() {
        let result = validate_env_parsing(&env(&[("FRITZBOX_POLL_INTERVAL_SECS", "0")]));
        assert!(
            result.is_err_and(|error| error.code == ErrorCode::new("config", "invalid_limit"))
        );
    }

    #[test]
    fn unparsable_values_are_rejected() {
        assert!(validate_env_parsing(&env(&[("FRITZBOX_PORT", "http")])).is_err());
    }
}
