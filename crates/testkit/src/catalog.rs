//! Scripted in-memory service catalog.
//!
//! Every configured action answers with a canned result or a canned fault.
//! Calls are recorded in a log shared by all clones of the catalog, so a test
//! can hand a clone to a loader and still inspect what was called.

use crate::errors::{action_fault, unreachable_error};
use fritzbox_domain::ScalarValue;
use fritzbox_ports::{
    ActionHandle, ActionResult, CatalogLoaderPort, DeviceTarget, ServiceCatalog, ServiceHandle,
};
use fritzbox_shared::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Canned = std::result::Result<ActionResult, String>;
type CallKey = (String, String);

#[derive(Debug, Default)]
struct CallLog {
    plain: BTreeMap<CallKey, usize>,
    indexed: BTreeMap<CallKey, Vec<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn result_from<'a>(pairs: impl IntoIterator<Item = (&'a str, ScalarValue)>) -> ActionResult {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[derive(Debug, Clone)]
struct InMemoryAction {
    service: String,
    name: String,
    plain: Option<Canned>,
    indexed: BTreeMap<u64, Canned>,
    log: Arc<Mutex<CallLog>>,
}

impl InMemoryAction {
    fn key(&self) -> CallKey {
        (self.service.clone(), self.name.clone())
    }
}

impl ActionHandle for InMemoryAction {
    fn call(&self) -> Result<ActionResult> {
        *lock(&self.log).plain.entry(self.key()).or_default() += 1;
        match &self.plain {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(action_fault(message)),
            None => Err(action_fault(&format!(
                "{} on {} expects an argument",
                self.name, self.service
            ))),
        }
    }

    fn call_with_param(&self, name: &str, value: &ScalarValue) -> Result<ActionResult> {
        let Some(index) = value.as_unsigned() else {
            return Err(action_fault(&format!("{name}: invalid argument {value}")));
        };
        lock(&self.log)
            .indexed
            .entry(self.key())
            .or_default()
            .push(index);
        match self.indexed.get(&index) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(action_fault(message)),
            None => Err(action_fault(&format!("SpecifiedArrayIndexInvalid: {index}"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct InMemoryService {
    actions: BTreeMap<String, InMemoryAction>,
}

impl ServiceHandle for InMemoryService {
    fn action(&self, name: &str) -> Option<&dyn ActionHandle> {
        self.actions
            .get(name)
            .map(|action| action as &dyn ActionHandle)
    }
}

/// In-memory catalog built with chained `with_*` calls.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    services: BTreeMap<String, InMemoryService>,
    log: Arc<Mutex<CallLog>>,
}

impl InMemoryCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service without actions.
    #[must_use]
    pub fn with_service(mut self, service: &str) -> Self {
        self.services.entry(service.to_string()).or_default();
        self
    }

    /// Add an action that fails every call until results are configured.
    #[must_use]
    pub fn with_action(mut self, service: &str, action: &str) -> Self {
        self.action_mut(service, action);
        self
    }

    /// Configure the parameterless result of `service`/`action`.
    #[must_use]
    pub fn with_result<'a>(
        mut self,
        service: &str,
        action: &str,
        pairs: impl IntoIterator<Item = (&'a str, ScalarValue)>,
    ) -> Self {
        self.action_mut(service, action).plain = Some(Ok(result_from(pairs)));
        self
    }

    /// Make the parameterless call of `service`/`action` fail.
    #[must_use]
    pub fn with_failure(mut self, service: &str, action: &str, message: &str) -> Self {
        self.action_mut(service, action).plain = Some(Err(message.to_string()));
        self
    }

    /// Configure the result for one index of a parameterised action.
    #[must_use]
    pub fn with_indexed<'a>(
        mut self,
        service: &str,
        action: &str,
        index: u64,
        pairs: impl IntoIterator<Item = (&'a str, ScalarValue)>,
    ) -> Self {
        self.action_mut(service, action)
            .indexed
            .insert(index, Ok(result_from(pairs)));
        self
    }

    /// Make one index of a parameterised action fail.
    #[must_use]
    pub fn with_index_failure(
        mut self,
        service: &str,
        action: &str,
        index: u64,
        message: &str,
    ) -> Self {
        self.action_mut(service, action)
            .indexed
            .insert(index, Err(message.to_string()));
        self
    }

    /// Number of parameterless calls made to `service`/`action`.
    pub fn calls(&self, service: &str, action: &str) -> usize {
        lock(&self.log)
            .plain
            .get(&(service.to_string(), action.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of parameterised calls made to `service`/`action`.
    pub fn param_calls(&self, service: &str, action: &str) -> usize {
        self.param_indices(service, action).len()
    }

    /// Indices passed to `service`/`action`, in call order.
    pub fn param_indices(&self, service: &str, action: &str) -> Vec<u64> {
        lock(&self.log)
            .indexed
            .get(&(service.to_string(), action.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Total calls of any kind.
    pub fn total_calls(&self) -> usize {
        let log = lock(&self.log);
        log.plain.values().sum::<usize>() + log.indexed.values().map(Vec::len).sum::<usize>()
    }

    fn action_mut(&mut self, service: &str, action: &str) -> &mut InMemoryAction {
        let log = Arc::clone(&self.log);
        self.services
            .entry(service.to_string())
            .or_default()
            .actions
            .entry(action.to_string())
            .or_insert_with(|| InMemoryAction {
                service: service.to_string(),
                name: action.to_string(),
                plain: None,
                indexed: BTreeMap::new(),
                log,
            })
    }
}

impl ServiceCatalog for InMemoryCatalog {
    fn service(&self, id: &str) -> Option<&dyn ServiceHandle> {
        self.services
            .get(id)
            .map(|service| service as &dyn ServiceHandle)
    }

    fn service_ids(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    targets: Vec<DeviceTarget>,
    failures_left: usize,
}

/// Loader that hands out clones of one [`InMemoryCatalog`].
#[derive(Debug)]
pub struct InMemoryCatalogLoader {
    catalog: Option<InMemoryCatalog>,
    message: String,
    state: Mutex<LoaderState>,
}

impl InMemoryCatalogLoader {
    /// Loader that always succeeds.
    pub fn new(catalog: InMemoryCatalog) -> Self {
        Self {
            catalog: Some(catalog),
            message: String::new(),
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// Loader that always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            catalog: None,
            message: message.to_string(),
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// Fail the first `count` loads before succeeding.
    #[must_use]
    pub fn with_failures(mut self, count: usize, message: &str) -> Self {
        self.message = message.to_string();
        lock(&self.state).failures_left = count;
        self
    }

    /// Number of load attempts.
    pub fn loads(&self) -> usize {
        lock(&self.state).targets.len()
    }

    /// Targets passed to every load attempt.
    pub fn targets(&self) -> Vec<DeviceTarget> {
        lock(&self.state).targets.clone()
    }
}

impl CatalogLoaderPort for InMemoryCatalogLoader {
    fn load(&self, target: &DeviceTarget) -> Result<Box<dyn ServiceCatalog>> {
        let mut state = lock(&self.state);
        state.targets.push(target.clone());
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(unreachable_error(&self.message));
        }
        match &self.catalog {
            Some(catalog) => Ok(Box::new(catalog.clone())),
            None => Err(unreachable_error(&self.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVC: &str = "urn:dslforum-org:service:WLANConfiguration:1";

    fn missing(what: &str) -> fritzbox_shared::ErrorEnvelope {
        fritzbox_shared::ErrorEnvelope::invariant(fritzbox_shared::ErrorCode::not_found(), what)
    }

    #[test]
    fn configured_results_are_returned_and_counted() -> Result<()> {
        let catalog = InMemoryCatalog::new()
            .with_result(SVC, "GetTotalAssociations", [("TotalAssociations", ScalarValue::Unsigned(2))])
            .with_indexed(SVC, "GetGenericAssociatedDeviceInfo", 1, [("X_AVM-DE_Speed", ScalarValue::Unsigned(144))]);

        let service = catalog.service(SVC).ok_or_else(|| missing("service"))?;
        let count = service
            .action("GetTotalAssociations")
            .ok_or_else(|| missing("count action"))?
            .call()?;
        assert_eq!(count.get("TotalAssociations"), Some(&ScalarValue::Unsigned(2)));

        let element = service
            .action("GetGenericAssociatedDeviceInfo")
            .ok_or_else(|| missing("element action"))?;
        assert!(element.call_with_param("NewAssociatedDeviceIndex", &ScalarValue::Unsigned(0)).is_err());
        assert!(element.call_with_param("NewAssociatedDeviceIndex", &ScalarValue::Unsigned(1)).is_ok());

        assert_eq!(catalog.calls(SVC, "GetTotalAssociations"), 1);
        assert_eq!(catalog.param_indices(SVC, "GetGenericAssociatedDeviceInfo"), vec![0, 1]);
        assert_eq!(catalog.total_calls(), 3);
        Ok(())
    }

    #[test]
    fn clones_share_the_call_log() -> Result<()> {
        let catalog = InMemoryCatalog::new().with_result(SVC, "Get", [("Key", ScalarValue::Unsigned(1))]);
        let loader = InMemoryCatalogLoader::new(catalog.clone());

        let loaded = loader.load(&DeviceTarget::new("fritz.box", 49000))?;
        loaded
            .service(SVC)
            .and_then(|service| service.action("Get"))
            .ok_or_else(|| missing("Get"))?
            .call()?;

        assert_eq!(catalog.calls(SVC, "Get"), 1);
        assert_eq!(loader.loads(), 1);
        assert_eq!(loaded.service_ids(), vec![SVC.to_string()]);
        Ok(())
    }

    #[test]
    fn loader_failures_run_out() {
        let loader = InMemoryCatalogLoader::new(InMemoryCatalog::new()).with_failures(2, "refused");
        let target = DeviceTarget::new("fritz.box", 49000);

        assert!(loader.load(&target).is_err());
        assert!(loader.load(&target).is_err());
        assert!(loader.load(&target).is_ok());
        assert!(InMemoryCatalogLoader::failing("down").load(&target).is_err());
    }
}
