//! Consecutive-call deduplication.
//!
//! The cache remembers the last successful `(service, action)` call and its
//! result. A definition that targets the same pair as the one right before it
//! reuses the stored result; anything else calls again. A failed call clears
//! the cache.

use fritzbox_ports::ActionResult;
use fritzbox_shared::{ErrorCode, ErrorEnvelope, Result};

#[derive(Debug, Clone)]
struct CacheEntry {
    service: String,
    action: String,
    result: ActionResult,
}

/// Result handed back by [`CallCache::fetch`].
#[derive(Debug, Clone, Copy)]
pub struct CachedResult<'a> {
    /// Result of the call (fresh or reused).
    pub result: &'a ActionResult,
    /// True when no remote call was made.
    pub cache_hit: bool,
}

/// Single-entry cache of the most recent successful call.
#[derive(Debug, Clone, Default)]
pub struct CallCache {
    entry: Option<CacheEntry>,
}

impl CallCache {
    /// Create an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { entry: None }
    }

    /// True unless the last successful call targeted the same pair.
    #[must_use]
    pub fn should_call(&self, service: &str, action: &str) -> bool {
        self.entry
            .as_ref()
            .is_none_or(|entry| entry.service != service || entry.action != action)
    }

    /// Record a successful call.
    pub fn store(&mut self, service: &str, action: &str, result: ActionResult) {
        self.entry = Some(CacheEntry {
            service: service.to_string(),
            action: action.to_string(),
            result,
        });
    }

    /// Forget the stored call.
    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Stored result, if any.
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.entry.as_ref().map(|entry| &entry.result)
    }

    /// Return the cached result for `(service, action)` or call `invoke`.
    ///
    /// On error the cache is cleared and the error is returned unchanged.
    pub fn fetch(
        &mut self,
        service: &str,
        action: &str,
        invoke: impl FnOnce() -> Result<ActionResult>,
    ) -> Result<CachedResult<'_>> {
        let cache_hit = !self.should_call(service, action);
        if !cache_hit {
            match invoke() {
                Ok(result) => self.store(service, action, result),
                Err(error) => {
                    self.clear();
                    return Err(error);
                },
            }
        }

        match &self.entry {
            Some(entry) => Ok(CachedResult {
                result: &entry.result,
                cache_hit,
            }),
            None => Err(ErrorEnvelope::invariant(
                ErrorCode::internal(),
                "call cache is empty after a successful call",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritzbox_domain::ScalarValue;
    use std::cell::Cell;

    fn result_with(key: &str, value: u64) -> ActionResult {
        ActionResult::from([(key.to_string(), ScalarValue::Unsigned(value))])
    }

    #[test]
    fn empty_cache_always_calls() {
        let cache = CallCache::new();
        assert!(cache.should_call("svc", "Get"));
        assert!(cache.result().is_none());
    }

    #[test]
    fn same_pair_is_served_from_cache() -> Result<()> {
        let calls = Cell::new(0);
        let mut cache = CallCache::new();
        for _ in 0..3 {
            let fetched = cache.fetch("svc", "Get", || {
                calls.set(calls.get() + 1);
                Ok(result_with("Key", 7))
            })?;
            assert_eq!(fetched.result.get("Key"), Some(&ScalarValue::Unsigned(7)));
        }
        assert_eq!(calls.get(), 1);
        Ok(())
    }

    #[test]
    fn different_service_or_action_calls_again() {
        let mut cache = CallCache::new();
        cache.store("svc", "Get", ActionResult::new());
        assert!(!cache.should_call("svc", "Get"));
        assert!(cache.should_call("svc", "Other"));
        assert!(cache.should_call("other", "Get"));
    }

    #[test]
    fn non_adjacent_repeat_calls_again() -> Result<()> {
        let calls = Cell::new(0);
        let mut cache = CallCache::new();
        for action in ["A", "B", "A"] {
            let fetched = cache.fetch("svc", action, || {
                calls.set(calls.get() + 1);
                Ok(ActionResult::new())
            })?;
            assert!(!fetched.cache_hit);
        }
        assert_eq!(calls.get(), 3);
        Ok(())
    }

    #[test]
    fn failure_clears_the_cache() {
        let mut cache = CallCache::new();
        cache.store("svc", "Get", result_with("Key", 1));

        let failed = cache.fetch("svc", "Other", || {
            Err(ErrorEnvelope::expected(ErrorCode::unavailable(), "busy"))
        });
        assert!(failed.is_err());
        assert!(cache.result().is_none());
        assert!(cache.should_call("svc", "Get"));
        assert!(cache.should_call("svc", "Other"));
    }
}
