//! Merging and placeholder resolution of properties.

mod builder;
mod error;
mod key;
mod merge;
mod properties;
mod resolve;

pub use builder::PropertiesBuilder;
pub use error::{ConversionError, PropertiesError};
pub use key::KeyNormalizer;
pub use merge::{
    MergedTable, MergedValue, PriorityTable, SourceEntry, DEFAULT_PRIORITY, ENVIRONMENT_PRIORITY,
    HIGHEST_PRIORITY, SYSTEM_PROPERTIES_PRIORITY,
};
pub use properties::{Properties, LIST_SEPARATOR};
pub use resolve::{resolve, Delimiters, ResolveOptions, ResolvedTable, DEFAULT_SEPARATOR};
