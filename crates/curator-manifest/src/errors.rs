use curator_catalogue::CatalogueError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, loading or writing manifests
#[derive(Error, Debug)]
pub enum ManifestError {
    /// A prefix is malformed, or a requested label cannot be resolved
    #[error("{0}")]
    MalformedPrefix(String),

    #[error("Empty config file: {}", .path.display())]
    EmptyManifest { path: PathBuf },

    #[error("Meta data '{key}' will override an existing value")]
    DuplicateMetadata { key: String },

    #[error("{0}")]
    InvalidDataset(String),

    #[error("Unknown user function '{name}'. Available: {available}")]
    UnknownUserFunction { name: String, available: String },

    #[error("No files found for dataset: {dataset}")]
    NoFiles { dataset: String },

    #[error("Cannot read manifest '{}': {source}", .path.display())]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
