//! Property sources feeding the merge engine.
//!
//! A source produces raw `key -> PropertyValue` pairs. Sources know nothing
//! about priorities, case policy or placeholders; those belong to the
//! builder that consumes them.

mod env;
mod file;
mod format;
mod memory;
mod system;

use std::collections::BTreeMap;

use crate::config::PropertiesError;

pub use env::EnvSource;
pub use file::{Location, ResourceSource, DEFAULT_CLASSPATH_ROOT};
pub use memory::MapSource;
pub use system::{system_properties, SystemPropertiesSource};

/// Raw entries produced by a single source read.
pub type SourceEntries = BTreeMap<String, PropertyValue>;

/// A raw property value together with its resolvability flag.
///
/// Literal values are copied through resolution untouched, so text such as
/// `${HOME}` coming from the host environment is never reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    value: String,
    resolvable: bool,
}

impl PropertyValue {
    /// A value that may contain placeholders.
    pub fn resolvable(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            resolvable: true,
        }
    }

    /// A value that is final text and is never scanned for placeholders.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            resolvable: false,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_resolvable(&self) -> bool {
        self.resolvable
    }
}

/// Capability implemented by every property source.
pub trait PropertySource: Send + Sync + std::fmt::Debug {
    /// Reads the source. Implementations must report a missing resource as
    /// [`PropertiesError::ResourceNotFound`] so callers can choose to ignore it.
    fn read(&self) -> Result<SourceEntries, PropertiesError>;
}

impl<S: PropertySource + ?Sized> PropertySource for Box<S> {
    fn read(&self) -> Result<SourceEntries, PropertiesError> {
        (**self).read()
    }
}

/// Wraps a source so that a missing resource contributes no entries.
///
/// Every other failure is passed through unchanged.
#[derive(Debug, Clone)]
pub struct IgnoreNotFound<S> {
    inner: S,
}

impl<S: PropertySource> PropertySource for IgnoreNotFound<S> {
    fn read(&self) -> Result<SourceEntries, PropertiesError> {
        match self.inner.read() {
            Err(PropertiesError::ResourceNotFound { location }) => {
                tracing::debug!(%location, "ignoring missing property resource");
                Ok(SourceEntries::new())
            }
            other => other,
        }
    }
}

/// Decorators available on every source.
pub trait SourceExt: PropertySource + Sized {
    fn ignore_not_found(self) -> IgnoreNotFound<Self> {
        IgnoreNotFound { inner: self }
    }
}

impl<S: PropertySource> SourceExt for S {}
