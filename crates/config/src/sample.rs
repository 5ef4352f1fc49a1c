/// One-line description of the collector input.
#[must_use]
pub const fn fritzbox_input_description() -> &'static str {
    "Read WAN traffic counters and WLAN client details from a FRITZ!Box"
}

/// Annotated sample configuration (TOML).
#[must_use]
pub const fn sample_config() -> &'static str {
    r#"version = 1

## Host and port of the FRITZ!Box control service
[device]
host = "fritz.box"
port = 49000
## Optional credentials
# username = ""
# password = ""

[poll]
## Seconds between polls
intervalSecs = 10
## Seconds to wait before reloading the service catalog after a failure
catalogRetrySecs = 60

[catalog]
## Recorded service catalog to read instead of a live device
# snapshotPath = "catalog.json"

[output]
## lineProtocol or ndjson
format = "lineProtocol"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_config_toml;
    use fritzbox_shared::ErrorEnvelope;

    #[test]
    fn sample_config_parses_to_defaults() -> Result<(), ErrorEnvelope> {
        let config = parse_config_toml(sample_config())?;
        assert_eq!(config.into_inner(), crate::FritzboxConfig::default());
        Ok(())
    }
}
