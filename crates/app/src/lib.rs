//! # fritzbox-app
//!
//! Metric collection use cases: the call cache, the simple and complex
//! collectors, and the per-poll orchestrator.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod call_cache;
pub mod collect_complex;
pub mod collect_simple;
pub mod gather;
mod observe;

pub use call_cache::{CallCache, CachedResult};
pub use collect_complex::{MAX_ELEMENTS_PER_INSTANCE, collect_complex};
pub use collect_simple::collect_simple;
pub use gather::{
    CATALOG_UNAVAILABLE, GatherDeps, GatherInput, GatherReport, gather, resolve_target,
};
pub use observe::{CollectContext, CollectStats};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
