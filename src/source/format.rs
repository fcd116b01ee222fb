//! Text formats understood by [`ResourceSource`](super::ResourceSource).

use toml::{Table, Value};

use super::{PropertyValue, SourceEntries};
use crate::config::PropertiesError;

/// Parses the line-oriented `key=value` properties format.
///
/// Supports `#` and `!` comments, `=`, `:` or whitespace as separator,
/// backslash line continuation and the `\t \n \r \f \uXXXX` escapes.
pub fn parse_properties(contents: &str, location: &str) -> Result<SourceEntries, PropertiesError> {
    let mut entries = SourceEntries::new();
    let mut lines = contents.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let line_number = index + 1;
        let mut logical = String::from(trimmed);
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (raw_key, raw_value) = split_key_value(&logical);
        let invalid = || PropertiesError::InvalidEscape {
            location: location.to_string(),
            line: line_number,
        };
        let key = unescape(raw_key).ok_or_else(invalid)?;
        let value = unescape(raw_value).ok_or_else(invalid)?;
        entries.insert(key, PropertyValue::resolvable(value));
    }

    Ok(entries)
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let rest = line[key_end..].trim_start_matches([' ', '\t', '\u{c}']);
    let rest = rest
        .strip_prefix(['=', ':'])
        .map(|r| r.trim_start_matches([' ', '\t', '\u{c}']))
        .unwrap_or(rest);
    (key, rest)
}

fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('\\') {
        return Some(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Some(out)
}

/// Parses TOML and flattens nested tables into dotted keys.
///
/// Scalars are stringified and arrays of scalars are joined with `,` so
/// they can be read back with the list accessors.
pub fn parse_toml(contents: &str, location: &str) -> Result<SourceEntries, PropertiesError> {
    let table: Table = toml::from_str(contents).map_err(|e| PropertiesError::ParseError {
        location: location.to_string(),
        source: e,
    })?;

    let mut entries = SourceEntries::new();
    flatten_table(&mut entries, "", table, location)?;
    Ok(entries)
}

fn flatten_table(
    entries: &mut SourceEntries,
    prefix: &str,
    table: Table,
    location: &str,
) -> Result<(), PropertiesError> {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Table(nested) => flatten_table(entries, &path, nested, location)?,
            Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| PropertiesError::UnsupportedValue {
                        location: location.to_string(),
                        key: path.clone(),
                    })?;
                entries.insert(path, PropertyValue::resolvable(parts.join(",")));
            }
            scalar => {
                if let Some(text) = scalar_to_string(&scalar) {
                    entries.insert(path, PropertyValue::resolvable(text));
                }
            }
        }
    }
    Ok(())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(dt) => Some(dt.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}
