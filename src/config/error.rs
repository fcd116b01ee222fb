use std::error::Error as StdError;
use thiserror::Error;

/// Errors raised while building a [`Properties`](super::Properties) instance.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PropertiesError {
    #[error("property resource not found: {location}")]
    ResourceNotFound { location: String },

    #[error("failed to read property resource '{location}': {source}")]
    ReadError {
        location: String,
        source: std::io::Error,
    },

    #[error("failed to parse property resource '{location}': {source}")]
    ParseError {
        location: String,
        source: toml::de::Error,
    },

    #[error("invalid escape sequence in '{location}' at line {line}")]
    InvalidEscape { location: String, line: usize },

    #[error("unsupported value for key '{key}' in '{location}': only scalars and arrays of scalars are allowed")]
    UnsupportedValue { location: String, key: String },

    #[error("unresolvable placeholders in keys: {}", .keys.join(", "))]
    UnresolvablePlaceholders { keys: Vec<String> },

    #[error("cyclic placeholder reference: {}", .chain.join(" -> "))]
    CyclicPlaceholder { chain: Vec<String> },
}

impl PropertiesError {
    /// Returns `true` if the error means a named source could not be located.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}

/// A typed accessor could not convert the resolved text of a key.
#[derive(Debug, Error)]
#[error("cannot convert value '{value}' of key '{key}' to {target}: {source}")]
pub struct ConversionError {
    pub key: String,
    pub value: String,
    pub target: &'static str,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl ConversionError {
    pub(crate) fn new<T, E>(key: &str, value: &str, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            target: std::any::type_name::<T>(),
            source: source.into(),
        }
    }
}
