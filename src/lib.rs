//! Layered key/value properties with placeholder resolution.
//!
//! Properties are collected from any number of [sources](source), merged by
//! priority into a single table and then resolved: values may reference
//! other keys with `${key}` or `${key:default}`, and references may nest.
//!
//! ```
//! use strata_props::{MapSource, Properties};
//!
//! let props = Properties::bare()
//!     .add(MapSource::new().with("host", "localhost").with("port", "8080"))
//!     .add(MapSource::new().with("url", "http://${host}:${port}/${path:api}"))
//!     .build()?;
//!
//! assert_eq!(props.get("url"), Some("http://localhost:8080/api"));
//! # Ok::<(), strata_props::Error>(())
//! ```

pub mod config;
mod error;
pub mod source;

pub use config::{
    ConversionError, Properties, PropertiesBuilder, PropertiesError, DEFAULT_PRIORITY,
    ENVIRONMENT_PRIORITY, HIGHEST_PRIORITY, SYSTEM_PROPERTIES_PRIORITY,
};
pub use error::Error;
pub use source::{
    system_properties, EnvSource, MapSource, PropertySource, PropertyValue, ResourceSource,
    SourceExt,
};
