use super::{PropertySource, PropertyValue, SourceEntries};
use crate::config::PropertiesError;

/// An in-memory source built programmatically.
///
/// ```
/// use strata_props::MapSource;
///
/// let source = MapSource::new()
///     .with("server.host", "localhost")
///     .with("server.url", "http://${server.host}/");
/// # let _ = source;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    entries: SourceEntries,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resolvable entry, replacing any previous value for `key`.
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_value(key, PropertyValue::resolvable(value))
    }

    pub fn with_value(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.entries.insert(key.into(), value);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |source, (k, v)| source.with(k, v))
    }
}

impl PropertySource for MapSource {
    fn read(&self) -> Result<SourceEntries, PropertiesError> {
        Ok(self.entries.clone())
    }
}
