//! Consistency checks over written manifests

use crate::dataset::DatasetRecord;
use crate::read::{from_yaml, LoadOptions};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Field reported when none is requested
pub const DEFAULT_CHECK_FIELD: &str = "nfiles";

/// A problem found while checking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckIssue {
    /// The manifest could not be loaded
    Load { manifest: PathBuf, message: String },
    /// A requested field is absent from a dataset
    MissingField { dataset: String, field: String },
    /// `nfiles` disagrees with the file list
    FileCountMismatch {
        dataset: String,
        nfiles: usize,
        files: usize,
    },
}

impl std::fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckIssue::Load { manifest, message } => {
                write!(f, "Cannot load '{}': {}", manifest.display(), message)
            }
            CheckIssue::MissingField { dataset, field } => {
                write!(f, "Dataset '{}' has no field '{}'", dataset, field)
            }
            CheckIssue::FileCountMismatch {
                dataset,
                nfiles,
                files,
            } => write!(
                f,
                "Dataset '{}' declares {} file(s) but lists {}",
                dataset, nfiles, files
            ),
        }
    }
}

/// Requested fields of one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub manifest: PathBuf,
    pub name: String,
    pub fields: Vec<(String, Option<Value>)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    pub datasets: Vec<DatasetSummary>,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

fn check_dataset(
    manifest: &Path,
    dataset: &DatasetRecord,
    fields: &[String],
    report: &mut CheckReport,
) {
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        let value = dataset.field(field);
        if value.is_none() {
            report.issues.push(CheckIssue::MissingField {
                dataset: dataset.name.clone(),
                field: field.clone(),
            });
        }
        values.push((field.clone(), value));
    }

    if let Some(nfiles) = dataset.nfiles {
        if nfiles != dataset.files.len() {
            report.issues.push(CheckIssue::FileCountMismatch {
                dataset: dataset.name.clone(),
                nfiles,
                files: dataset.files.len(),
            });
        }
    }

    report.datasets.push(DatasetSummary {
        manifest: manifest.to_path_buf(),
        name: dataset.name.clone(),
        fields: values,
    });
}

/// Load every manifest and collect the requested fields and any problems
pub fn check_manifests(manifests: &[PathBuf], fields: &[String], selected_prefix: Option<&str>) -> CheckReport {
    let options = LoadOptions {
        selected_prefix: selected_prefix.filter(|p| !p.is_empty()).map(str::to_string),
        ..Default::default()
    };

    let mut report = CheckReport::default();
    for manifest in manifests {
        debug!("Checking {}", manifest.display());
        match from_yaml(manifest, &options) {
            Ok(datasets) => {
                for dataset in &datasets {
                    check_dataset(manifest, dataset, fields, &mut report);
                }
            }
            Err(e) => report.issues.push(CheckIssue::Load {
                manifest: manifest.clone(),
                message: e.to_string(),
            }),
        }
    }
    report
}
