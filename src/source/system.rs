//! Process-wide system properties.

use super::{PropertySource, PropertyValue, SourceEntries};
use crate::config::PropertiesError;

/// A thread-safe, process-wide string registry.
///
/// Plays the role of host-level settings that any part of a program may set
/// before building its configuration. Builds only ever see a snapshot.
pub mod system_properties {
    use std::collections::BTreeMap;
    use std::sync::{PoisonError, RwLock};

    use once_cell::sync::Lazy;

    static REGISTRY: Lazy<RwLock<BTreeMap<String, String>>> =
        Lazy::new(|| RwLock::new(BTreeMap::new()));

    /// Sets `key`, returning the previous value if any.
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        REGISTRY
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into())
    }

    pub fn get(key: &str) -> Option<String> {
        REGISTRY
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn remove(key: &str) -> Option<String> {
        REGISTRY
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Copies the current contents of the registry.
    pub fn snapshot() -> BTreeMap<String, String> {
        REGISTRY
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Reads a snapshot of [`system_properties`]. Values are resolvable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPropertiesSource;

impl PropertySource for SystemPropertiesSource {
    fn read(&self) -> Result<SourceEntries, PropertiesError> {
        Ok(system_properties::snapshot()
            .into_iter()
            .map(|(k, v)| (k, PropertyValue::resolvable(v)))
            .collect())
    }
}
