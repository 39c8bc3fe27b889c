//! One-call curation of datasets from raw file lists

use crate::dataset::DatasetRecord;
use crate::errors::ManifestError;
use crate::write::{prepare_file_list, FileListRequest};
use curator_catalogue::reader::strip_cycle;
use curator_catalogue::{get_file_list_expander, get_trees, EventFileReader, DEFAULT_EXPANDER};
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::debug;

/// Event type used when none is given
pub const DEFAULT_EVENT_TYPE: &str = "data";

/// Files and settings for one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurateInput {
    pub files: Vec<String>,
    pub event_type: String,
    pub expander: String,
    pub prefix: Option<String>,
    pub ignore_inaccessible: bool,
    pub include_branches: bool,
}

impl CurateInput {
    pub fn new(files: Vec<String>) -> Self {
        Self {
            files,
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            expander: DEFAULT_EXPANDER.to_string(),
            prefix: None,
            ignore_inaccessible: false,
            include_branches: false,
        }
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn with_expander(mut self, expander: impl Into<String>) -> Self {
        self.expander = expander.into();
        self
    }
}

/// Curate one dataset, taking the tree from the first file
pub fn curate(
    reader: &dyn EventFileReader,
    dataset: &str,
    input: &CurateInput,
) -> Result<DatasetRecord, ManifestError> {
    let no_files = || ManifestError::NoFiles {
        dataset: dataset.to_string(),
    };
    if input.files.is_empty() {
        return Err(no_files());
    }

    let expander = get_file_list_expander(&input.expander)?;
    let expanded = expander.expand(&input.files, input.prefix.as_deref())?;
    let first = expanded.first().ok_or_else(no_files)?;

    let trees = get_trees(reader, first)?;
    let Some(tree) = trees.first() else {
        return Err(ManifestError::InvalidDataset(format!(
            "No trees found in '{}' for dataset '{}'",
            first, dataset
        )));
    };
    let tree = strip_cycle(tree).to_string();
    debug!("Dataset '{}' uses tree '{}'", dataset, tree);

    let mut request = FileListRequest::new(
        input.files.clone(),
        dataset,
        input.event_type.clone(),
        vec![tree],
    )
    .with_expander(input.expander.clone())
    .with_prefix(input.prefix.clone());
    request.ignore_inaccessible = input.ignore_inaccessible;
    request.include_branches = input.include_branches;
    prepare_file_list(reader, request)
}

/// Curate independent datasets in parallel
///
/// Results keep the input order; the first failure is returned.
pub fn curate_all(
    reader: &dyn EventFileReader,
    datasets: &IndexMap<String, CurateInput>,
) -> Result<IndexMap<String, DatasetRecord>, ManifestError> {
    let entries: Vec<(&String, &CurateInput)> = datasets.iter().collect();
    let results: Vec<(String, Result<DatasetRecord, ManifestError>)> = entries
        .par_iter()
        .map(|(name, input)| ((*name).clone(), curate(reader, name, input)))
        .collect();

    results
        .into_iter()
        .map(|(name, result)| result.map(|record| (name, record)))
        .collect()
}
