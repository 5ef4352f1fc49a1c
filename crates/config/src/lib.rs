//! # fritzbox-config
//!
//! Configuration schema, validation, env overrides and file loading for the
//! collector. This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file).
pub mod load;
/// Sample configuration text.
pub mod sample;
/// Configuration schema types and helpers.
pub mod schema;

pub use env::{EnvParseError, FritzboxEnv, apply_env_overrides};
pub use load::{
    load_config_from_path, load_config_from_str, load_config_std_env, to_pretty_json,
    to_pretty_toml,
};
pub use sample::{fritzbox_input_description, sample_config};
pub use schema::{
    CURRENT_CONFIG_VERSION, CatalogConfig, ConfigFormat, ConfigSchemaError, DeviceConfig,
    FritzboxConfig, OutputConfig, OutputFormat, PollConfig, ValidatedFritzboxConfig,
    parse_config_json, parse_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritzbox_domain::domain_crate_version;
    use fritzbox_shared::shared_crate_version;

    #[test]
    fn config_can_use_domain_and_shared() {
        assert!(!config_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
