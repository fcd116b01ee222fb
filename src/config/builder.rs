use std::path::PathBuf;

use super::key::KeyNormalizer;
use super::merge::{
    PriorityTable, DEFAULT_PRIORITY, ENVIRONMENT_PRIORITY, SYSTEM_PROPERTIES_PRIORITY,
};
use super::resolve::{resolve, Delimiters, ResolveOptions};
use super::{Properties, PropertiesError};
use crate::source::{
    EnvSource, PropertySource, ResourceSource, SourceExt, SystemPropertiesSource,
    DEFAULT_CLASSPATH_ROOT,
};

/// A source waiting to be read at build time.
#[derive(Debug)]
enum PendingSource {
    Source(Box<dyn PropertySource>),
    Location { location: String, required: bool },
}

/// Builder collecting property sources and resolution options.
///
/// Sources are merged by priority: a source with a higher priority wins,
/// and between equal priorities the one added later wins. Sources added
/// without a priority use [`DEFAULT_PRIORITY`], which ranks below the
/// built-in environment and system property sources registered by
/// [`Properties::builder`]. Use [`HIGHEST_PRIORITY`](super::HIGHEST_PRIORITY)
/// to override everything.
///
/// Values may reference other keys with `${key}` or `${key:default}`;
/// references are resolved after merging, so they can point at keys from
/// any source.
///
/// ## Example
///
/// ```no_run
/// use strata_props::{MapSource, Properties, HIGHEST_PRIORITY};
///
/// let props = Properties::builder()
///     .add_location("classpath:application.properties")
///     .add_optional_location("file:./local.properties")
///     .add_with_priority(MapSource::new().with("server.port", "9090"), HIGHEST_PRIORITY)
///     .case_sensitive(false)
///     .build()?;
///
/// let port = props.get_i32_or("server.port", 8080)?;
/// # let _ = port;
/// # Ok::<(), strata_props::Error>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct PropertiesBuilder {
    sources: Vec<(PendingSource, i32)>,
    options: ResolveOptions,
    classpath_roots: Vec<PathBuf>,
}

impl Default for PropertiesBuilder {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            options: ResolveOptions::default(),
            classpath_roots: vec![PathBuf::from(DEFAULT_CLASSPATH_ROOT)],
        }
    }
}

impl PropertiesBuilder {
    /// A builder with the environment and system property sources registered.
    pub(crate) fn with_defaults() -> Self {
        Self::default()
            .add_with_priority(EnvSource::new(), ENVIRONMENT_PRIORITY)
            .add_with_priority(SystemPropertiesSource, SYSTEM_PROPERTIES_PRIORITY)
    }

    /// Adds a source with [`DEFAULT_PRIORITY`].
    pub fn add(self, source: impl PropertySource + 'static) -> Self {
        self.add_with_priority(source, DEFAULT_PRIORITY)
    }

    pub fn add_with_priority(mut self, source: impl PropertySource + 'static, priority: i32) -> Self {
        self.sources
            .push((PendingSource::Source(Box::new(source)), priority));
        self
    }

    /// Adds a resource by location string (`file:`, `classpath:` or a bare
    /// path). The build fails if the resource does not exist.
    pub fn add_location(self, location: impl Into<String>) -> Self {
        self.push_location(location.into(), true, DEFAULT_PRIORITY)
    }

    pub fn add_location_with_priority(self, location: impl Into<String>, priority: i32) -> Self {
        self.push_location(location.into(), true, priority)
    }

    /// Adds a resource that is silently skipped if it does not exist.
    pub fn add_optional_location(self, location: impl Into<String>) -> Self {
        self.push_location(location.into(), false, DEFAULT_PRIORITY)
    }

    pub fn add_optional_location_with_priority(self, location: impl Into<String>, priority: i32) -> Self {
        self.push_location(location.into(), false, priority)
    }

    fn push_location(mut self, location: String, required: bool, priority: i32) -> Self {
        self.sources
            .push((PendingSource::Location { location, required }, priority));
        self
    }

    /// Directories searched, in order, for `classpath:` locations.
    ///
    /// Applies to every location added to this builder. Defaults to
    /// `resources` relative to the working directory.
    pub fn classpath_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.classpath_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Whether keys are matched case-sensitively. Defaults to `true`.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.options.normalizer = KeyNormalizer::new(case_sensitive);
        self
    }

    /// Sets the placeholder delimiters. Defaults to `${` and `}`.
    ///
    /// # Panics
    ///
    /// Panics if either delimiter is empty or both are equal.
    pub fn delimiters(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.options.delimiters = Delimiters::new(start, end);
        self
    }

    /// Leave unresolvable placeholders in place instead of failing the build.
    /// Defaults to `false`. Cyclic references fail regardless.
    pub fn ignore_unresolvable_placeholders(mut self, ignore: bool) -> Self {
        self.options.ignore_unresolvable = ignore;
        self
    }

    /// Reads, merges and resolves every source.
    pub fn build(self) -> Result<Properties, PropertiesError> {
        let mut table = PriorityTable::new();
        for (pending, priority) in self.sources {
            let source: Box<dyn PropertySource> = match pending {
                PendingSource::Source(source) => source,
                PendingSource::Location { location, required } => {
                    let resource = ResourceSource::new(location)
                        .with_classpath_roots(self.classpath_roots.iter().cloned());
                    if required {
                        Box::new(resource)
                    } else {
                        Box::new(resource.ignore_not_found())
                    }
                }
            };
            table.push(source, priority);
        }

        let normalizer = self.options.normalizer;
        let merged = table.merge(normalizer)?;
        let resolved = resolve(&merged, &self.options)?;

        tracing::debug!(
            sources = table.len(),
            properties = resolved.len(),
            case_sensitive = normalizer.is_case_sensitive(),
            "properties built"
        );

        Ok(Properties::new(resolved, normalizer))
    }
}
