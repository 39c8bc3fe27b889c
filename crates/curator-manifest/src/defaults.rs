//! Factoring shared values into a `defaults` block

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Field that is never factored
const NAME_KEY: &str = "name";

/// The written manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Mapping>,
    pub datasets: Vec<Mapping>,
}

impl ManifestDocument {
    /// Datasets with the defaults merged back in
    pub fn expanded(&self) -> Vec<Mapping> {
        let Some(defaults) = &self.defaults else {
            return self.datasets.clone();
        };
        self.datasets
            .iter()
            .map(|dataset| {
                let mut merged = dataset.clone();
                for (key, value) in defaults {
                    if !merged.contains_key(key) {
                        merged.insert(key.clone(), value.clone());
                    }
                }
                merged
            })
            .collect()
    }
}

/// The value shared by a strict, unambiguous majority
///
/// Only values occurring more than once compete. The most frequent one wins
/// unless another value occurs just as often.
pub fn select_default<T: PartialEq + Clone>(values: &[T]) -> Option<T> {
    let mut groups: Vec<(&T, usize)> = Vec::new();
    for value in values {
        match groups.iter_mut().find(|(group, _)| *group == value) {
            Some((_, count)) => *count += 1,
            None => groups.push((value, 1)),
        }
    }

    let max_count = groups.iter().map(|(_, count)| *count).filter(|c| *c > 1).max()?;
    let mut leaders = groups.iter().filter(|(_, count)| *count == max_count);
    let (leader, _) = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }
    Some((*leader).clone())
}

/// Build the manifest, lifting shared values into `defaults`
///
/// Only fields present in every dataset are considered. A dataset keeps a
/// field when its value differs from the default.
pub fn prepare_contents(datasets: Vec<Mapping>, no_defaults_in_output: bool) -> ManifestDocument {
    if no_defaults_in_output || datasets.is_empty() {
        return ManifestDocument {
            defaults: None,
            datasets,
        };
    }

    let mut keys: Vec<&Value> = Vec::new();
    for dataset in &datasets {
        for key in dataset.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut defaults = Mapping::new();
    for key in keys {
        if key.as_str() == Some(NAME_KEY) {
            continue;
        }
        let values: Option<Vec<Value>> = datasets.iter().map(|d| d.get(key).cloned()).collect();
        if let Some(default) = values.and_then(|v| select_default(&v)) {
            defaults.insert(key.clone(), default);
        }
    }

    let datasets = datasets
        .into_iter()
        .map(|dataset| {
            dataset
                .into_iter()
                .filter(|(key, value)| defaults.get(key) != Some(value))
                .collect()
        })
        .collect();

    ManifestDocument {
        defaults: (!defaults.is_empty()).then_some(defaults),
        datasets,
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
    fn test_select_default() {
        assert_eq!(select_default(&[0, 1, 2, 2, 2, 3]), Some(2));
        assert_eq!(select_default(&[0, 1, 2, 3]), None);
        assert_eq!(select_default(&[0, 1, 2, 2, 3, 3]), None);
        assert_eq!(select_default::<i32>(&[]), None);
    }

    #[test]
    fn test_select_default_three_way_ties() {
        assert_eq!(select_default(&[1, 1, 2, 2, 3, 3]), None);
        assert_eq!(select_default(&[1, 1, 1, 2, 2, 3, 3]), Some(1));
        assert_eq!(select_default(&[3, 3, 1, 1, 2, 2, 2, 4, 4]), Some(2));
        assert_eq!(select_default(&[5, 5, 5, 6, 6, 6, 7, 7, 7]), None);
    }

    #[test]
    fn test_select_default_ignores_order() {
        assert_eq!(select_default(&["b", "a", "b", "c", "a", "b"]), Some("b"));
    }

    #[test]
    fn test_prepare_contents() {
        let datasets = vec![
            mapping("{name: foo, one: i1, two: 2, three: '3', a: [ay, ee, eye]}"),
            mapping("{name: bar, one: '1', two: 2, three: 3i, a: [eye, oh, you]}"),
            mapping("{name: baz, one: '1', two: 2, three: 3j, a: [oh]}"),
        ];
        let contents = prepare_contents(datasets, false);

        let Some(defaults) = &contents.defaults else {
            panic!("shared values must be factored");
        };
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults.get("one"), Some(&Value::String("1".to_string())));
        assert_eq!(defaults.get("two"), Some(&Value::Number(2.into())));
        assert_eq!(contents.datasets.len(), 3);
        assert!(contents.datasets.iter().all(|d| !d.contains_key("two")));
        assert!(contents.datasets[0].contains_key("one"));
        assert!(!contents.datasets[1].contains_key("one"));
        assert!(!contents.datasets[2].contains_key("one"));
        assert_eq!(contents.datasets[1].get("name"), Some(&Value::String("bar".to_string())));
        assert!(contents.datasets.iter().all(|d| d.contains_key("a")));
    }

    #[test]
    fn test_prepare_contents_round_trip() {
        let datasets = vec![
            mapping("{name: a, eventtype: mc, tree: events, nfiles: 0}"),
            mapping("{name: b, eventtype: mc, tree: events, nfiles: 0}"),
            mapping("{name: c, eventtype: data, tree: events, nfiles: 2, extra: x}"),
        ];
        let contents = prepare_contents(datasets.clone(), false);
        assert!(contents.defaults.as_ref().is_some_and(|d| d.len() == 3));
        assert_eq!(contents.expanded(), datasets);
    }

    #[test]
    fn test_name_is_never_factored() {
        let datasets = vec![mapping("{name: same}"), mapping("{name: same}")];
        let contents = prepare_contents(datasets, false);
        assert!(contents.defaults.is_none());
        assert!(contents.datasets.iter().all(|d| d.contains_key("name")));
    }

    #[test]
    fn test_fields_missing_somewhere_are_kept() {
        let datasets = vec![
            mapping("{name: a, user: me}"),
            mapping("{name: b, user: me}"),
            mapping("{name: c}"),
        ];
        let contents = prepare_contents(datasets, false);
        assert!(contents.defaults.is_none());
        assert!(contents.datasets[0].contains_key("user"));
    }

    #[test]
    fn test_factoring_disabled() {
        let datasets = vec![mapping("{name: a, two: 2}"), mapping("{name: b, two: 2}")];
        let contents = prepare_contents(datasets.clone(), true);
        assert!(contents.defaults.is_none());
        assert_eq!(contents.datasets, datasets);
    }
}
