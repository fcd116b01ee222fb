//! File and classpath-style resource sources.

use std::path::{Component, Path, PathBuf};

use super::format::{parse_properties, parse_toml};
use super::{PropertySource, SourceEntries};
use crate::config::PropertiesError;

const FILE_PREFIX: &str = "file:";
const CLASSPATH_PREFIX: &str = "classpath:";

/// Directory searched for `classpath:` resources when none is configured.
pub const DEFAULT_CLASSPATH_ROOT: &str = "resources";

/// Where a resource lives, parsed from its string form.
///
/// - `file:<path>` or a bare path: a filesystem path, relative to the
///   working directory or absolute.
/// - `classpath:<path>`: a resource bundled under one of the classpath roots;
///   subdirectories are allowed; leading `./` or `/` and any `..` segment
///   are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Classpath(PathBuf),
}

impl Location {
    pub fn parse(location: &str) -> Self {
        if let Some(path) = location.strip_prefix(CLASSPATH_PREFIX) {
            let relative: PathBuf = Path::new(path)
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .collect();
            Self::Classpath(relative)
        } else {
            let path = location.strip_prefix(FILE_PREFIX).unwrap_or(location);
            Self::File(PathBuf::from(path))
        }
    }
}

/// Reads a properties or TOML resource.
///
/// The format is picked from the extension: `.toml` files are flattened
/// into dotted keys, anything else is read as `key=value` properties.
#[derive(Debug, Clone)]
pub struct ResourceSource {
    raw: String,
    location: Location,
    classpath_roots: Vec<PathBuf>,
}

impl ResourceSource {
    pub fn new(location: impl Into<String>) -> Self {
        let raw = location.into();
        Self {
            location: Location::parse(&raw),
            raw,
            classpath_roots: vec![PathBuf::from(DEFAULT_CLASSPATH_ROOT)],
        }
    }

    /// Replaces the directories searched for `classpath:` resources, in order.
    pub fn with_classpath_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.classpath_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    fn locate(&self) -> Result<PathBuf, PropertiesError> {
        let not_found = || PropertiesError::ResourceNotFound {
            location: self.raw.clone(),
        };

        match &self.location {
            Location::File(path) => Ok(path.clone()),
            Location::Classpath(relative) => {
                if relative.as_os_str().is_empty() {
                    return Err(not_found());
                }
                self.classpath_roots
                    .iter()
                    .map(|root| root.join(relative))
                    .find(|candidate| candidate.is_file())
                    .ok_or_else(not_found)
            }
        }
    }
}

impl PropertySource for ResourceSource {
    fn read(&self) -> Result<SourceEntries, PropertiesError> {
        let path = self.locate()?;

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PropertiesError::ResourceNotFound {
                    location: self.raw.clone(),
                });
            }
            Err(e) => {
                return Err(PropertiesError::ReadError {
                    location: self.raw.clone(),
                    source: e,
                });
            }
        };

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            parse_toml(&contents, &self.raw)
        } else {
            parse_properties(&contents, &self.raw)
        }
    }
}
