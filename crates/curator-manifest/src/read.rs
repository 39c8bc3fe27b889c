//! Loading dataset manifests
//!
//! A manifest may import other manifests, declare `defaults` shared by its
//! datasets, and list datasets either by name or as mappings:
//!
//! ```yaml
//! import:
//!   - "{this_dir}/common.yml"
//! defaults:
//!   eventtype: mc
//! datasets:
//!   - just_a_name
//!   - name: two
//!     files: ["{prefix}three"]
//!     prefix: /data/
//! ```

use crate::dataset::{canonicalize_keys, DatasetRecord};
use crate::errors::ManifestError;
use crate::prefix::apply_prefix;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Placeholder for the directory of the manifest being read
pub const THIS_DIR_PLACEHOLDER: &str = "{this_dir}";

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Defaults applied beneath the manifest's own
    pub defaults: Mapping,
    /// Label of the prefix alternative to expand with
    pub selected_prefix: Option<String>,
    /// Substitute `{prefix}` in file names
    pub expand_prefix: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            defaults: Mapping::new(),
            selected_prefix: None,
            expand_prefix: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(default)]
    import: Vec<String>,
    #[serde(default)]
    defaults: Mapping,
    #[serde(default)]
    datasets: Vec<Value>,
}

fn load_document(path: &Path) -> Result<RawManifest, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::ReadManifest {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&content)?;
    let is_empty = match &value {
        Value::Null => true,
        Value::Mapping(m) => m.is_empty(),
        _ => false,
    };
    if is_empty {
        return Err(ManifestError::EmptyManifest {
            path: path.to_path_buf(),
        });
    }
    Ok(serde_yaml::from_value(value)?)
}

fn identity(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn manifest_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// A dataset given only by name
pub fn from_string(name: &str, defaults: &Mapping) -> Mapping {
    let mut dataset = defaults.clone();
    dataset.insert(Value::String("name".to_string()), Value::String(name.to_string()));
    dataset
}

/// A dataset given as a mapping; its own keys win over `defaults`
pub fn from_dict(dataset: &Mapping, defaults: &Mapping) -> Result<Mapping, ManifestError> {
    if !dataset.contains_key("name") {
        return Err(ManifestError::InvalidDataset(
            "Dataset must contain a 'name' key".to_string(),
        ));
    }
    let mut merged = defaults.clone();
    for (key, value) in canonicalize_keys(dataset) {
        merged.insert(key, value);
    }
    Ok(merged)
}

struct Loader<'a> {
    options: &'a LoadOptions,
    imported: HashSet<PathBuf>,
}

impl Loader<'_> {
    fn load(&mut self, path: &Path, inherited: &Mapping) -> Result<Vec<DatasetRecord>, ManifestError> {
        debug!("Loading manifest {}", path.display());
        let document = load_document(path)?;
        let dir = manifest_dir(path);

        let mut defaults = inherited.clone();
        for (key, value) in canonicalize_keys(&document.defaults) {
            defaults.insert(key, value);
        }

        let mut datasets = Vec::new();
        for import in &document.import {
            let import_path =
                PathBuf::from(import.replace(THIS_DIR_PLACEHOLDER, &dir.to_string_lossy()));
            if !self.imported.insert(identity(&import_path)) {
                debug!("Skipping already imported {}", import_path.display());
                continue;
            }
            datasets.extend(self.load(&import_path, &defaults)?);
        }

        for entry in &document.datasets {
            let mapping = match entry {
                Value::String(name) => from_string(name, &defaults),
                Value::Mapping(dataset) => from_dict(dataset, &defaults)?,
                other => {
                    return Err(ManifestError::InvalidDataset(format!(
                        "Invalid dataset format: {:?}",
                        other
                    )))
                }
            };
            let mut record = DatasetRecord::from_mapping(mapping)?;
            if self.options.expand_prefix {
                let prefix = record.prefix()?;
                record.files = apply_prefix(
                    prefix.as_ref(),
                    &record.files,
                    self.options.selected_prefix.as_deref(),
                    &record.name,
                )?;
            }
            datasets.push(record);
        }
        Ok(datasets)
    }
}

/// Load all datasets of a manifest, imports first
pub fn from_yaml(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Vec<DatasetRecord>, ManifestError> {
    let path = path.as_ref();
    let mut loader = Loader {
        options,
        imported: HashSet::from([identity(path)]),
    };
    let defaults = canonicalize_keys(&options.defaults);
    loader.load(path, &defaults)
}
