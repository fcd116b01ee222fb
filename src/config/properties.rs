use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};

use super::builder::PropertiesBuilder;
use super::key::KeyNormalizer;
use super::resolve::ResolvedTable;
use super::ConversionError;

/// Separator used by the list accessors.
pub const LIST_SEPARATOR: char = ',';

/// An immutable, fully resolved set of properties.
///
/// Lookups go through the same key normalization used while building, so a
/// case-insensitive instance answers queries in any case. Typed accessors
/// come in two forms: `get_x(key)` returns `Ok(None)` for an absent key and
/// `get_x_or(key, default)` substitutes the default. Both report a value
/// that cannot be parsed as a [`ConversionError`]; a default never hides a
/// parse failure.
#[derive(Clone, PartialEq, Eq)]
pub struct Properties {
    values: ResolvedTable,
    normalizer: KeyNormalizer,
}

impl Properties {
    /// A builder with the environment and system property sources already
    /// registered; system properties override the environment, which
    /// overrides sources added without an explicit priority.
    pub fn builder() -> PropertiesBuilder {
        PropertiesBuilder::with_defaults()
    }

    /// A builder without any built-in source.
    pub fn bare() -> PropertiesBuilder {
        PropertiesBuilder::default()
    }

    pub(crate) fn new(values: ResolvedTable, normalizer: KeyNormalizer) -> Self {
        Self { values, normalizer }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&*self.normalizer.normalize(key))
            .map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Converts the value of `key` with a caller-supplied function.
    pub fn get_with<T, E, F>(&self, key: &str, convert: F) -> Result<Option<T>, ConversionError>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.get(key)
            .map(|value| convert(value).map_err(|e| ConversionError::new::<T, _>(key, value, e)))
            .transpose()
    }

    pub fn get_with_or<T, E, F>(&self, key: &str, default: T, convert: F) -> Result<T, ConversionError>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Ok(self.get_with(key, convert)?.unwrap_or(default))
    }

    /// Parses the value of `key` with [`FromStr`].
    ///
    /// Works for any parseable type, including arbitrary-precision decimals
    /// and integers from other crates.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConversionError>
    where
        T: FromStr,
        T::Err: StdError + Send + Sync + 'static,
    {
        self.get_with(key, str::parse::<T>)
    }

    pub fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConversionError>
    where
        T: FromStr,
        T::Err: StdError + Send + Sync + 'static,
    {
        self.get_with_or(key, default, str::parse::<T>)
    }

    pub fn get_i32(&self, key: &str) -> Result<Option<i32>, ConversionError> {
        self.get_parsed(key)
    }

    pub fn get_i32_or(&self, key: &str, default: i32) -> Result<i32, ConversionError> {
        self.get_parsed_or(key, default)
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ConversionError> {
        self.get_parsed(key)
    }

    pub fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, ConversionError> {
        self.get_parsed_or(key, default)
    }

    /// Widest built-in integer.
    pub fn get_i128(&self, key: &str) -> Result<Option<i128>, ConversionError> {
        self.get_parsed(key)
    }

    pub fn get_i128_or(&self, key: &str, default: i128) -> Result<i128, ConversionError> {
        self.get_parsed_or(key, default)
    }

    pub fn get_f32(&self, key: &str) -> Result<Option<f32>, ConversionError> {
        self.get_parsed(key)
    }

    pub fn get_f32_or(&self, key: &str, default: f32) -> Result<f32, ConversionError> {
        self.get_parsed_or(key, default)
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConversionError> {
        self.get_parsed(key)
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, ConversionError> {
        self.get_parsed_or(key, default)
    }

    /// Accepts `true` or `false` in any case.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConversionError> {
        self.get_with(key, parse_bool)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ConversionError> {
        self.get_with_or(key, default, parse_bool)
    }

    /// Matches the value exactly against the variant names of a unit enum.
    ///
    /// ```
    /// use serde::Deserialize;
    /// use strata_props::{MapSource, Properties};
    ///
    /// #[derive(Debug, PartialEq, Deserialize)]
    /// enum Mode {
    ///     Fast,
    ///     Safe,
    /// }
    ///
    /// let props = Properties::bare()
    ///     .add(MapSource::new().with("mode", "Safe"))
    ///     .build()?;
    /// assert_eq!(props.get_enum::<Mode>("mode")?, Some(Mode::Safe));
    /// # Ok::<(), strata_props::Error>(())
    /// ```
    pub fn get_enum<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConversionError> {
        self.get_with(key, parse_enum::<T>)
    }

    pub fn get_enum_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConversionError> {
        self.get_with_or(key, default, parse_enum::<T>)
    }

    /// Splits the value on `,`, dropping trailing empty elements. An absent
    /// or empty value yields no elements.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        split_list(self.get(key)).map(str::to_string).collect()
    }

    pub fn get_array(&self, key: &str) -> Box<[String]> {
        self.get_list(key).into_boxed_slice()
    }

    /// Splits the value on `,` and converts every element.
    pub fn get_list_with<T, E, F>(&self, key: &str, mut convert: F) -> Result<Vec<T>, ConversionError>
    where
        F: FnMut(&str) -> Result<T, E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        split_list(self.get(key))
            .map(|item| convert(item).map_err(|e| ConversionError::new::<T, _>(key, item, e)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over normalized keys and resolved values, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // values may hold secrets from the environment
        f.debug_struct("Properties")
            .field("len", &self.values.len())
            .field("normalizer", &self.normalizer)
            .finish()
    }
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .map(|v| v.trim_end_matches(LIST_SEPARATOR))
        .filter(|v| !v.is_empty())
        .into_iter()
        .flat_map(|v| v.split(LIST_SEPARATOR))
}

#[derive(Debug)]
struct InvalidBool;

impl fmt::Display for InvalidBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected 'true' or 'false'")
    }
}

impl StdError for InvalidBool {}

fn parse_bool(value: &str) -> Result<bool, InvalidBool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(InvalidBool)
    }
}

fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, ValueError> {
    let deserializer: StrDeserializer<'_, ValueError> = value.into_deserializer();
    T::deserialize(deserializer)
}
