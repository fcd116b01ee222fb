use super::{PropertySource, PropertyValue, SourceEntries};
use crate::config::PropertiesError;

/// Exposes the process environment as literal property values.
///
/// Each variable appears twice: under its own name and under a normalized
/// name, lower-cased with `_` replaced by `.`, so `DATABASE_HOST` can be
/// queried as `database.host`. The environment is snapshotted on every
/// [`read`](PropertySource::read); it is never consulted during resolution.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
    /// Reads the live process environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed set of variables instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl PropertySource for EnvSource {
    fn read(&self) -> Result<SourceEntries, PropertiesError> {
        let vars: Vec<(String, String)> = match &self.vars {
            Some(vars) => vars.clone(),
            // Non-unicode variables cannot be represented as properties.
            None => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        };

        let mut entries = SourceEntries::new();
        for (key, value) in vars {
            let normalized = normalize_env_key(&key);
            if normalized != key {
                entries.insert(normalized, PropertyValue::literal(value.clone()));
            }
            entries.insert(key, PropertyValue::literal(value));
        }

        Ok(entries)
    }
}

fn normalize_env_key(key: &str) -> String {
    key.to_lowercase().replace('_', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_keys_are_normalized() {
        let entries = EnvSource::from_vars([("DATABASE_HOST", "db.local")])
            .read()
            .unwrap();

        assert_eq!(entries["DATABASE_HOST"].value(), "db.local");
        assert_eq!(entries["database.host"].value(), "db.local");
    }

    #[test]
    fn test_env_values_are_literal() {
        let entries = EnvSource::from_vars([("PS1", "${user}@host")]).read().unwrap();
        assert!(entries.values().all(|v| !v.is_resolvable()));
    }

    #[test]
    fn test_reads_process_environment() {
        // cargo exports this to every test binary it runs
        let entries = EnvSource::new().read().unwrap();
        let name = entries["CARGO_PKG_NAME"].value();
        assert_eq!(entries["cargo.pkg.name"].value(), name);
    }

    #[test]
    fn test_already_normalized_key_appears_once() {
        let entries = EnvSource::from_vars([("path", "/bin")]).read().unwrap();
        assert_eq!(entries.len(), 1);
    }
}
