//! Paths to the shared fixture files under `crates/testkit/fixtures`.

use std::path::PathBuf;

/// Root of the fixture tree.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Path of a fixture relative to the fixture root, e.g. `catalog/fritzbox-7590.json`.
pub fn fixture_path(relative: &str) -> PathBuf {
    fixtures_dir().join(relative)
}

/// Read a fixture to a string.
pub fn read_fixture(relative: &str) -> std::io::Result<String> {
    std::fs::read_to_string(fixture_path(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_fixture_is_readable() -> std::io::Result<()> {
        let raw = read_fixture("catalog/fritzbox-7590.json")?;
        assert!(raw.contains("WLANConfiguration:1"));
        Ok(())
    }
}
