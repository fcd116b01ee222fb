//! Priority-ordered merging of property sources.

use std::collections::BTreeMap;

use super::key::KeyNormalizer;
use super::PropertiesError;
use crate::source::{PropertySource, PropertyValue};

/// Priority of sources added without an explicit priority.
pub const DEFAULT_PRIORITY: i32 = 0;
/// Priority of the built-in environment variable source.
pub const ENVIRONMENT_PRIORITY: i32 = 1_000;
/// Priority of the built-in system property source.
pub const SYSTEM_PROPERTIES_PRIORITY: i32 = 2_000;
/// Sentinel priority that outranks every other source.
///
/// Between two sources both at this priority, the later registration wins.
pub const HIGHEST_PRIORITY: i32 = i32::MAX;

/// A registered source with its rank.
#[derive(Debug)]
pub struct SourceEntry {
    pub source: Box<dyn PropertySource>,
    pub priority: i32,
    pub sequence: usize,
}

/// The winning value for a key, with the rank that made it win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedValue {
    pub value: PropertyValue,
    pub priority: i32,
    pub sequence: usize,
}

impl MergedValue {
    /// Equal priorities fall back to registration order.
    fn outranks(&self, other: &MergedValue) -> bool {
        (self.priority, self.sequence) >= (other.priority, other.sequence)
    }
}

/// Normalized key to winning value.
pub type MergedTable = BTreeMap<String, MergedValue>;

/// Accumulates sources in registration order.
#[derive(Debug, Default)]
pub struct PriorityTable {
    entries: Vec<SourceEntry>,
}

impl PriorityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source`, assigning it the next sequence number.
    pub fn push(&mut self, source: Box<dyn PropertySource>, priority: i32) {
        let sequence = self.entries.len();
        self.entries.push(SourceEntry {
            source,
            priority,
            sequence,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads every source once and keeps, for each normalized key, the value
    /// from the highest-ranked source that defines it.
    pub fn merge(&self, normalizer: KeyNormalizer) -> Result<MergedTable, PropertiesError> {
        let mut merged = MergedTable::new();

        for entry in &self.entries {
            let values = entry.source.read()?;
            tracing::debug!(
                sequence = entry.sequence,
                priority = entry.priority,
                entries = values.len(),
                "merging property source"
            );

            for (key, value) in values {
                let candidate = MergedValue {
                    value,
                    priority: entry.priority,
                    sequence: entry.sequence,
                };
                insert_ranked(&mut merged, normalizer.normalize(&key).into_owned(), candidate);
            }
        }

        Ok(merged)
    }
}

fn insert_ranked(merged: &mut MergedTable, key: String, candidate: MergedValue) {
    match merged.get_mut(&key) {
        Some(current) if candidate.outranks(current) => {
            tracing::trace!(
                %key,
                from_sequence = current.sequence,
                to_sequence = candidate.sequence,
                "property overridden"
            );
            *current = candidate;
        }
        Some(_) => {}
        None => {
            merged.insert(key, candidate);
        }
    }
}
