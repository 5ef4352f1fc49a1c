//! # fritzbox-testkit
//!
//! Test helpers and in-memory adapters.
//! This crate depends on `domain`, `ports` and `shared`.

pub mod catalog;
pub mod errors;
pub mod fixtures;
pub mod observe;
pub mod sink;

pub use catalog::{InMemoryCatalog, InMemoryCatalogLoader};
pub use fixtures::{fixture_path, fixtures_dir, read_fixture};
pub use observe::{NoopLogger, NoopTelemetry, RecordingLogger, RecordingTelemetry};
pub use sink::RecordingSink;

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritzbox_ports::ports_crate_version;
    use fritzbox_shared::shared_crate_version;

    #[test]
    fn testkit_crate_compiles() {
        let version = testkit_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn testkit_can_use_ports_and_shared() {
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn error_fixtures_are_available() {
        let codes = errors::common_error_codes();
        assert!(!codes.is_empty());
    }
}
