//! Service identifiers for numbered service families.

use crate::DomainError;
use std::fmt;
use std::num::NonZeroU32;

/// One numbered instance of a service family.
///
/// The rendered form is `prefix:index`, with instances numbered from 1
/// (`urn:dslforum-org:service:WLANConfiguration:1` is the first radio).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceInstanceId {
    prefix: Box<str>,
    index: NonZeroU32,
}

impl ServiceInstanceId {
    /// Build the id for instance `index` of the family `prefix`.
    pub fn new(prefix: &str, index: u32) -> Result<Self, DomainError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(DomainError::EmptyServicePrefix);
        }
        let index = NonZeroU32::new(index).ok_or_else(|| DomainError::ZeroServiceIndex {
            prefix: prefix.to_string(),
        })?;
        Ok(Self {
            prefix: prefix.into(),
            index,
        })
    }

    /// Iterate the ids `prefix:1 ..= prefix:count`.
    pub fn family(prefix: &str, count: u32) -> Result<Vec<Self>, DomainError> {
        (1..=count).map(|index| Self::new(prefix, index)).collect()
    }

    /// Service family prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 1-based instance number.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index.get()
    }
}

impl fmt::Display for ServiceInstanceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.prefix, self.index)
    }
}
