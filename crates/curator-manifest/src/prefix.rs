//! File prefixes
//!
//! A dataset may carry a single prefix or a list of labelled alternatives:
//!
//! ```yaml
//! prefix:
//!   - default: /data/
//!   - mirror: root://eos.example.org//data/
//! ```
//!
//! File names refer to the chosen prefix with a `{prefix}` placeholder.

use crate::errors::ManifestError;
use serde_yaml::{Mapping, Value};

/// Placeholder substituted by [`apply_prefix`]
pub const PREFIX_PLACEHOLDER: &str = "{prefix}";

/// Label given to the prefix recorded by the writer
pub const DEFAULT_LABEL: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    Single(String),
    /// Labelled alternatives in declaration order; duplicates are kept so that
    /// selection can report them
    Named(Vec<(String, String)>),
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

impl Prefix {
    /// Parse a prefix as found in a manifest; empty values mean "no prefix"
    pub fn from_value(value: &Value, dataset: &str) -> Result<Option<Self>, ManifestError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(Prefix::Single(s.clone()))),
            Value::Sequence(items) if items.is_empty() => Ok(None),
            Value::Sequence(items) => {
                let mut alternatives = Vec::with_capacity(items.len());
                for item in items {
                    let entry = match item {
                        Value::Mapping(m) if m.len() == 1 => m.iter().next(),
                        _ => None,
                    };
                    let pair = entry
                        .and_then(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)));
                    let Some(pair) = pair else {
                        return Err(ManifestError::MalformedPrefix(
                            "'prefix' is a list, but not all elements are single-entry mappings"
                                .to_string(),
                        ));
                    };
                    alternatives.push(pair);
                }
                Ok(Some(Prefix::Named(alternatives)))
            }
            other => Err(ManifestError::MalformedPrefix(format!(
                "'prefix' for dataset '{}' is type {}. Need a string or a list of single-entry mappings",
                dataset,
                type_name(other)
            ))),
        }
    }

    /// The prefix recorded by the writer: `[{default: prefix}]`
    pub fn recorded(prefix: &str) -> Value {
        let mut entry = Mapping::new();
        entry.insert(
            Value::String(DEFAULT_LABEL.to_string()),
            Value::String(prefix.to_string()),
        );
        Value::Sequence(vec![Value::Mapping(entry)])
    }

    /// Pick the prefix string; without a selection the first alternative wins
    pub fn resolve(&self, selected: Option<&str>, dataset: &str) -> Result<&str, ManifestError> {
        let alternatives = match self {
            Prefix::Single(prefix) => return Ok(prefix.as_str()),
            Prefix::Named(alternatives) => alternatives,
        };

        let Some(label) = selected.filter(|s| !s.is_empty()) else {
            return alternatives
                .first()
                .map(|(_, value)| value.as_str())
                .ok_or_else(|| {
                    ManifestError::MalformedPrefix(format!(
                        "No prefix defined for dataset '{}'",
                        dataset
                    ))
                });
        };

        let matched: Vec<&str> = alternatives
            .iter()
            .filter(|(name, _)| name == label)
            .map(|(_, value)| value.as_str())
            .collect();
        match matched.as_slice() {
            [value] => Ok(*value),
            [] => Err(ManifestError::MalformedPrefix(format!(
                "Prefix '{}' is not defined for dataset '{}'",
                label, dataset
            ))),
            _ => Err(ManifestError::MalformedPrefix(format!(
                "Prefix '{}' is defined {} times, not sure which to use",
                label,
                matched.len()
            ))),
        }
    }
}

/// Substitute `{prefix}` in every file name
pub fn apply_prefix(
    prefix: Option<&Prefix>,
    files: &[String],
    selected: Option<&str>,
    dataset: &str,
) -> Result<Vec<String>, ManifestError> {
    let Some(prefix) = prefix else {
        return Ok(files.to_vec());
    };
    let value = prefix.resolve(selected, dataset)?;
    Ok(files
        .iter()
        .map(|file| file.replace(PREFIX_PLACEHOLDER, value))
        .collect())
}

/// Turn paths under `prefix` back into `{prefix}` templates
pub fn parameterize(files: Vec<String>, prefix: &str) -> Vec<String> {
    files
        .into_iter()
        .map(|path| match path.strip_prefix(prefix) {
            Some(rest) => format!("{}{}", PREFIX_PLACEHOLDER, rest),
            None => path,
        })
        .collect()
}
