//! Dataset records

use crate::errors::ManifestError;
use crate::prefix::Prefix;
use curator_catalogue::EventCount;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Spellings accepted for the typed fields, mapped to the written key
const FIELD_ALIASES: [(&str, &str); 4] = [
    ("event_type", "eventtype"),
    ("n_events", "nevents"),
    ("n_files", "nfiles"),
    ("trees", "tree"),
];

/// Canonical spelling of a dataset field
pub fn canonical_key(key: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, canonical)| *canonical)
}

/// Rewrite aliased keys of a mapping to their canonical spelling
pub fn canonicalize_keys(mapping: &Mapping) -> Mapping {
    mapping
        .iter()
        .map(|(key, value)| {
            let key = match key {
                Value::String(s) => Value::String(canonical_key(s).to_string()),
                other => other.clone(),
            };
            (key, value.clone())
        })
        .collect()
}

/// One tree name, or several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeSpec {
    Single(String),
    Many(Vec<String>),
}

impl TreeSpec {
    /// A single name collapses to [`TreeSpec::Single`]
    pub fn from_names(mut names: Vec<String>) -> Self {
        if names.len() == 1 {
            TreeSpec::Single(names.remove(0))
        } else {
            TreeSpec::Many(names)
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            TreeSpec::Single(name) => vec![name.clone()],
            TreeSpec::Many(names) => names.clone(),
        }
    }
}

/// A curated dataset
///
/// Fields the curator knows about are typed; anything else a manifest carries
/// (user metadata, `metadata:` blocks, ...) lives in `metadata` and is written
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub name: String,

    #[serde(alias = "event_type", default, skip_serializing_if = "Option::is_none")]
    pub eventtype: Option<String>,

    #[serde(alias = "trees", default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeSpec>,

    #[serde(default)]
    pub files: Vec<String>,

    #[serde(alias = "n_events", default, skip_serializing_if = "Option::is_none")]
    pub nevents: Option<EventCount>,

    #[serde(alias = "n_files", default, skip_serializing_if = "Option::is_none")]
    pub nfiles: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<IndexMap<String, IndexMap<String, usize>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Value>,

    #[serde(flatten)]
    pub metadata: Mapping,
}

impl DatasetRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_mapping(mapping: Mapping) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_value(Value::Mapping(canonicalize_keys(&mapping)))?)
    }

    pub fn to_mapping(&self) -> Result<Mapping, ManifestError> {
        match serde_yaml::to_value(self)? {
            Value::Mapping(mapping) => Ok(mapping),
            _ => Err(ManifestError::InvalidDataset(format!(
                "Dataset '{}' does not serialize to a mapping",
                self.name
            ))),
        }
    }

    pub fn prefix(&self) -> Result<Option<Prefix>, ManifestError> {
        match &self.prefix {
            Some(value) => Prefix::from_value(value, &self.name),
            None => Ok(None),
        }
    }

    pub fn tree_names(&self) -> Vec<String> {
        self.tree.as_ref().map(TreeSpec::names).unwrap_or_default()
    }

    /// Look a field up by name, typed fields included
    pub fn field(&self, key: &str) -> Option<Value> {
        let key = canonical_key(key);
        self.to_mapping().ok()?.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        let Ok(Value::Mapping(m)) = serde_yaml::from_str::<Value>(yaml) else {
            panic!("test YAML must be a mapping");
        };
        m
    }

    #[test]
    fn test_aliases_are_accepted() {
        let record = DatasetRecord::from_mapping(mapping(
            "{name: one, event_type: mc, n_events: 10, n_files: 2, trees: [a, b], files: [x, y]}",
        ));
        let Ok(record) = record else {
            panic!("aliased record must load");
        };
        assert_eq!(record.eventtype.as_deref(), Some("mc"));
        assert_eq!(record.nevents, Some(EventCount::Total(10)));
        assert_eq!(record.nfiles, Some(2));
        assert_eq!(record.tree_names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let Ok(record) = DatasetRecord::from_mapping(mapping(
            "{name: one, user: me, metadata: {campaign: 2018}, tree: events}",
        )) else {
            panic!("record must load");
        };
        assert_eq!(record.metadata.len(), 2);
        assert!(record.field("user").is_some_and(|v| v == Value::String("me".to_string())));

        let Ok(written) = record.to_mapping() else {
            panic!("record must serialize");
        };
        assert_eq!(written.get("tree"), Some(&Value::String("events".to_string())));
        assert!(written.contains_key("metadata"));
        assert!(!written.contains_key("nevents"));
    }

    #[test]
    fn test_written_keys_are_canonical() {
        let mut record = DatasetRecord::new("data");
        record.eventtype = Some("data".to_string());
        record.nfiles = Some(0);
        let Ok(written) = record.to_mapping() else {
            panic!("record must serialize");
        };
        let keys: Vec<&str> = written.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["name", "eventtype", "files", "nfiles"]);
    }

    #[test]
    fn test_per_file_event_counts() {
        let Ok(record) =
            DatasetRecord::from_mapping(mapping("{name: one, nevents: {a.root: 3, b.root: 4}}"))
        else {
            panic!("record must load");
        };
        assert!(record.nevents.is_some_and(|n| matches!(n, EventCount::PerKey(_)) && n.total() == 7));
    }

    #[test]
    fn test_tree_spec_collapses_single_name() {
        assert_eq!(
            TreeSpec::from_names(vec!["events".to_string()]),
            TreeSpec::Single("events".to_string())
        );
        assert!(matches!(
            TreeSpec::from_names(vec!["a".to_string(), "b".to_string()]),
            TreeSpec::Many(_)
        ));
    }

    #[test]
    fn test_missing_name_is_rejected() {
        assert!(DatasetRecord::from_mapping(mapping("{files: [a]}")).is_err());
    }
}
