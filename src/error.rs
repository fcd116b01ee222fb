use crate::config::{ConversionError, PropertiesError};
use thiserror::Error;

/// Top-level error type for the strata-props library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to build properties: {0}")]
    Properties(#[from] PropertiesError),

    #[error("invalid property value: {0}")]
    Conversion(#[from] ConversionError),
}
