//! Device service catalog boundary contract.
//!
//! A catalog is the already-resolved view of a device: the services it
//! exposes, the actions on each service and a way to invoke them. Loading a
//! catalog (discovery) is the only step that can fail as a whole; every call
//! after that fails individually.

use fritzbox_domain::ScalarValue;
use fritzbox_shared::{Result, SecretString};
use std::collections::BTreeMap;
use std::fmt;

/// Result of one action invocation: result key to typed value.
pub type ActionResult = BTreeMap<String, ScalarValue>;

/// Connection parameters for one device.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    /// Hostname or address.
    pub host: String,
    /// Control port.
    pub port: u16,
    /// Login name (may be empty).
    pub username: String,
    /// Login password.
    pub password: SecretString,
}

impl DeviceTarget {
    /// Build a target without credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: String::new(),
            password: SecretString::default(),
        }
    }

    /// Attach credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }
}

impl fmt::Debug for DeviceTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DeviceTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password)
            .finish()
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.host, self.port)
    }
}

/// A callable action on a service.
pub trait ActionHandle {
    /// Invoke without parameters.
    fn call(&self) -> Result<ActionResult>;

    /// Invoke with exactly one named parameter.
    fn call_with_param(&self, name: &str, value: &ScalarValue) -> Result<ActionResult>;
}

/// One service exposed by the device.
pub trait ServiceHandle {
    /// Look up an action by name.
    fn action(&self, name: &str) -> Option<&dyn ActionHandle>;
}

/// Resolved set of services for one poll.
pub trait ServiceCatalog {
    /// Look up a service by its full id.
    fn service(&self, id: &str) -> Option<&dyn ServiceHandle>;

    /// Every service id in the catalog, sorted.
    fn service_ids(&self) -> Vec<String>;
}

/// Boundary contract for loading a device catalog.
pub trait CatalogLoaderPort: Send + Sync {
    /// Resolve the catalog for `target`.
    fn load(&self, target: &DeviceTarget) -> Result<Box<dyn ServiceCatalog>>;
}
