//! CLI command handlers.

pub mod config;
pub mod info;
pub mod metrics;
pub mod poll;

pub use config::{run_config_check, run_config_sample, run_config_show};
pub use info::run_info;
pub use metrics::run_metrics;
pub use poll::{PollCommandInput, run_gather, run_watch_command};
