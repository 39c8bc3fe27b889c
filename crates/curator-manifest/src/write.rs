//! Building dataset records and writing manifests

use crate::dataset::{DatasetRecord, TreeSpec};
use crate::defaults::prepare_contents;
use crate::errors::ManifestError;
use crate::prefix::{parameterize, Prefix};
use crate::read::{from_yaml, LoadOptions};
use curator_catalogue::reader::is_address;
use curator_catalogue::{get_file_list_expander, EventFileReader, ValidationPolicy, DEFAULT_EXPANDER};
use serde_yaml::{Mapping, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything needed to turn file patterns into a dataset record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListRequest {
    pub files: Vec<String>,
    pub dataset: String,
    pub event_type: String,
    pub trees: Vec<String>,
    pub expander: String,
    pub prefix: Option<String>,
    pub no_empty_files: bool,
    pub confirm_tree: bool,
    pub ignore_inaccessible: bool,
    pub include_branches: bool,
}

impl FileListRequest {
    pub fn new(
        files: Vec<String>,
        dataset: impl Into<String>,
        event_type: impl Into<String>,
        trees: Vec<String>,
    ) -> Self {
        Self {
            files,
            dataset: dataset.into(),
            event_type: event_type.into(),
            trees,
            expander: DEFAULT_EXPANDER.to_string(),
            prefix: None,
            no_empty_files: true,
            confirm_tree: true,
            ignore_inaccessible: false,
            include_branches: false,
        }
    }

    pub fn with_expander(mut self, expander: impl Into<String>) -> Self {
        self.expander = expander.into();
        self
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    fn policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            disallow_empty: self.no_empty_files,
            confirm_tree: self.confirm_tree,
            list_branches: self.include_branches,
            ignore_inaccessible: self.ignore_inaccessible,
        }
    }
}

/// Absolute, symlink-free form of a local path
///
/// `file:tree` addresses and URLs are returned unchanged; paths that cannot be
/// resolved are made absolute against the working directory.
fn canonical_path(entry: String) -> String {
    if is_address(&entry) {
        return entry;
    }
    if let Ok(path) = fs::canonicalize(&entry) {
        return path.to_string_lossy().to_string();
    }
    let path = Path::new(&entry);
    if path.is_absolute() {
        return entry;
    }
    env::current_dir()
        .map(|cwd| cwd.join(path).to_string_lossy().to_string())
        .unwrap_or(entry)
}

/// Expand, validate and count a file list into a dataset record
pub fn prepare_file_list(
    reader: &dyn EventFileReader,
    request: FileListRequest,
) -> Result<DatasetRecord, ManifestError> {
    let expander = get_file_list_expander(&request.expander)?;
    let prefix = request.prefix.as_deref();

    let expanded = expander.expand(&request.files, prefix)?;
    debug!("Expanded {} pattern(s) into {} file(s)", request.files.len(), expanded.len());
    let full_list: Vec<String> = expanded.into_iter().map(canonical_path).collect();

    let validation = expander.validate(reader, full_list, &request.trees, request.policy())?;
    let nevents = validation.n_events();

    let mut record = DatasetRecord::new(request.dataset.clone());
    record.files = match prefix {
        Some(prefix) => {
            record.prefix = Some(Prefix::recorded(prefix));
            parameterize(validation.files, prefix)
        }
        None => validation.files,
    };
    record.eventtype = Some(request.event_type.clone());
    record.nfiles = Some(record.files.len());
    record.nevents = Some(nevents);
    record.tree = Some(TreeSpec::from_names(request.trees.clone()));
    if !validation.branches.is_empty() {
        record.branches = Some(validation.branches);
    }

    info!(
        "Dataset '{}': {} file(s), {} event(s)",
        record.name,
        record.files.len(),
        record.nevents.as_ref().map_or(0, |n| n.total())
    );
    Ok(record)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Keep the datasets already in the output file
    pub append: bool,
    /// Write every field on every dataset
    pub no_defaults_in_output: bool,
}

/// Write datasets to `output`, returning its absolute path
pub fn write_yaml(
    datasets: Vec<Mapping>,
    output: &Path,
    options: WriteOptions,
) -> Result<PathBuf, ManifestError> {
    let mut all = Vec::new();
    if options.append && output.exists() {
        let load = LoadOptions {
            expand_prefix: false,
            ..Default::default()
        };
        for existing in from_yaml(output, &load)? {
            all.push(existing.to_mapping()?);
        }
        debug!("Appending to {} existing dataset(s)", all.len());
    }
    all.extend(datasets);

    let contents = prepare_contents(all, options.no_defaults_in_output);
    fs::write(output, serde_yaml::to_string(&contents)?)?;

    let written = fs::canonicalize(output)?;
    info!("Manifest written to {}", written.display());
    Ok(written)
}

/// Add user metadata; existing fields are never overwritten
pub fn add_meta(dataset: &mut Mapping, meta: &[(String, Value)]) -> Result<(), ManifestError> {
    for (key, value) in meta {
        if dataset.contains_key(key.as_str()) {
            return Err(ManifestError::DuplicateMetadata { key: key.clone() });
        }
        dataset.insert(Value::String(key.clone()), value.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_catalogue::{EventCount, MemoryFile, MemoryReader, ObjectNode};
    use tempfile::TempDir;

    const FIXTURES: [(&str, Option<u64>); 4] = [
        ("events_100.root", Some(100)),
        ("events_202.root", Some(202)),
        ("empty.root", Some(0)),
        ("no-tree.root", None),
    ];

    /// Four empty files on disk, described to an in-memory reader
    fn fixtures() -> Option<(TempDir, MemoryReader)> {
        let dir = TempDir::new().ok()?;
        let mut reader = MemoryReader::new();
        for (name, entries) in FIXTURES {
            let path = dir.path().join(name);
            fs::write(&path, b"").ok()?;
            let path = fs::canonicalize(&path).ok()?.to_string_lossy().to_string();
            let file = match entries {
                Some(n) => MemoryFile::new().with_tree("events", n, &["ev"]),
                None => MemoryFile::new().with_object(ObjectNode::new("hist;1", "TH1F")),
            };
            reader.insert(path, file);
        }
        Some((dir, reader))
    }

    fn request(dir: &TempDir, expander: &str) -> FileListRequest {
        let pattern = dir.path().join("*.root").to_string_lossy().to_string();
        let mut request =
            FileListRequest::new(vec![pattern], "data", "mc", vec!["events".to_string()])
                .with_expander(expander);
        request.confirm_tree = false;
        request.include_branches = true;
        request
    }

    #[test]
    fn test_prepare_file_list_drops_empty_files() {
        let Some((dir, reader)) = fixtures() else {
            return;
        };
        for expander in ["xrootd", "local"] {
            let Ok(record) = prepare_file_list(&reader, request(&dir, expander)) else {
                panic!("file list preparation failed");
            };
            assert_eq!(record.name, "data");
            assert_eq!(record.eventtype.as_deref(), Some("mc"));
            assert_eq!(record.nfiles, Some(2));
            assert_eq!(record.nevents, Some(EventCount::Total(302)));
            assert_eq!(record.tree, Some(TreeSpec::Single("events".to_string())));
            assert!(record.files.iter().any(|f| f.contains("events_202")));
            let branches = record.branches.unwrap_or_default();
            assert_eq!(branches.len(), 1);
            assert_eq!(branches["events"].len(), 1);
        }
    }

    #[test]
    fn test_prepare_file_list_keeps_empty_files() {
        let Some((dir, reader)) = fixtures() else {
            return;
        };
        let mut request = request(&dir, "local");
        request.no_empty_files = false;
        let Ok(record) = prepare_file_list(&reader, request) else {
            panic!("file list preparation failed");
        };
        assert_eq!(record.nfiles, Some(4));
        assert!(record.nevents.is_some_and(|n| n.total() == 302));
    }

    #[test]
    fn test_prepare_file_list_confirms_trees() {
        let Some((dir, reader)) = fixtures() else {
            return;
        };
        for no_empty_files in [true, false] {
            let mut request = request(&dir, "local");
            request.confirm_tree = true;
            request.no_empty_files = no_empty_files;
            let Err(err) = prepare_file_list(&reader, request) else {
                panic!("missing tree must fail");
            };
            let message = err.to_string();
            assert!(message.contains("Missing"));
            assert!(message.contains("events"));
        }
    }

    #[test]
    fn test_prepare_file_list_with_prefix() {
        let Some((dir, reader)) = fixtures() else {
            return;
        };
        let Ok(base) = fs::canonicalize(dir.path()) else {
            return;
        };
        let prefix = format!("{}/", base.to_string_lossy());
        let mut request = FileListRequest::new(
            vec!["*.root".to_string()],
            "data",
            "data",
            vec!["events".to_string()],
        )
        .with_expander("local")
        .with_prefix(Some(prefix.clone()));
        request.confirm_tree = false;

        let Ok(record) = prepare_file_list(&reader, request) else {
            panic!("file list preparation failed");
        };
        assert!(record.files.iter().all(|f| f.starts_with("{prefix}")));
        assert!(record.prefix().is_ok_and(|p| p == Some(Prefix::Named(vec![(
            "default".to_string(),
            prefix.clone()
        )]))));
    }

    #[test]
    fn test_unknown_expander() {
        let reader = MemoryReader::new();
        let request = FileListRequest::new(vec![], "d", "data", vec!["events".to_string()])
            .with_expander("gobbledy gook");
        let Err(err) = prepare_file_list(&reader, request) else {
            panic!("unknown expander must fail");
        };
        assert!(err.to_string().contains("Unknown catalogue"));
    }

    #[test]
    fn test_addresses_are_not_canonicalized() {
        assert_eq!(canonical_path("data/f.root:events".to_string()), "data/f.root:events");
        assert!(Path::new(&canonical_path("no/such/file.root".to_string())).is_absolute());
    }

    #[test]
    fn test_add_meta() {
        let Ok(Value::Mapping(mut dataset)) = serde_yaml::from_str::<Value>("{one: 1, two: '2'}") else {
            panic!("test YAML must be a mapping");
        };
        let meta = vec![
            ("three".to_string(), Value::Number(3.into())),
            ("4".to_string(), Value::String("four".to_string())),
        ];
        assert!(add_meta(&mut dataset, &meta).is_ok());
        assert_eq!(dataset.get("three"), Some(&Value::Number(3.into())));
        assert_eq!(dataset.get("4"), Some(&Value::String("four".to_string())));

        let clash = vec![("one".to_string(), Value::String("3/3".to_string()))];
        let Err(err) = add_meta(&mut dataset, &clash) else {
            panic!("overriding metadata must fail");
        };
        assert!(err.to_string().contains("will override"));
    }

    fn record(name: &str, eventtype: &str) -> Mapping {
        let mut record = DatasetRecord::new(name);
        record.eventtype = Some(eventtype.to_string());
        record.files = vec![format!("/data/{}.root", name)];
        record.nfiles = Some(1);
        record.to_mapping().unwrap_or_default()
    }

    #[test]
    fn test_write_yaml_factors_defaults() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let output = dir.path().join("out.yml");
        let written = write_yaml(
            vec![record("a", "mc"), record("b", "mc"), record("c", "data")],
            &output,
            WriteOptions::default(),
        );
        assert!(written.is_ok_and(|p| p.is_absolute()));

        let Ok(text) = fs::read_to_string(&output) else {
            panic!("output must exist");
        };
        assert!(text.contains("defaults:"));
        assert!(!text.contains('&'));

        let loaded = from_yaml(&output, &LoadOptions::default());
        assert!(loaded.is_ok_and(|d| d.len() == 3
            && d[0].eventtype.as_deref() == Some("mc")
            && d[2].eventtype.as_deref() == Some("data")));
    }

    #[test]
    fn test_write_yaml_appends() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let output = dir.path().join("out.yml");
        let append = WriteOptions {
            append: true,
            no_defaults_in_output: false,
        };
        assert!(write_yaml(vec![record("a", "mc")], &output, append).is_ok());
        assert!(write_yaml(vec![record("b", "mc")], &output, append).is_ok());

        let loaded = from_yaml(&output, &LoadOptions::default());
        assert!(loaded.is_ok_and(|d| d.len() == 2 && d[0].name == "a" && d[1].name == "b"));
    }

    #[test]
    fn test_write_yaml_without_defaults() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let output = dir.path().join("out.yml");
        let options = WriteOptions {
            append: false,
            no_defaults_in_output: true,
        };
        assert!(write_yaml(vec![record("a", "mc"), record("b", "mc")], &output, options).is_ok());
        let text = fs::read_to_string(&output).unwrap_or_default();
        assert!(!text.contains("defaults:"));
        assert_eq!(text.matches("eventtype: mc").count(), 2);
    }
}
