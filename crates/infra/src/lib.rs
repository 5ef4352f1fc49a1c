//! # fritzbox-infra
//!
//! Composition root: builds adapters from the validated config, runs one
//! poll, and drives the poll loop on tokio.
//! This crate depends on `app`, `adapters`, `config`, `ports`, and `shared`.

mod config_check;
mod env_check;
mod observability;
mod poll_loop;
mod wiring;

pub use fritzbox_app::{CATALOG_UNAVAILABLE, GatherReport};
pub use config_check::{check_config, load_effective_config_json, load_effective_config_toml};
pub use env_check::{InfraError, InfraResult, validate_env_parsing};
pub use observability::{LogFormat, Observability};
pub use poll_loop::{
    PollSchedule, PollSummary, SERVICE_LOAD_RETRY, run_gather_once, run_poll_loop, run_watch,
};
pub use wiring::{
    MISSING_CATALOG_SOURCE, build_catalog_loader, build_gather_deps, build_sink,
    gather_input_from_config,
};

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
