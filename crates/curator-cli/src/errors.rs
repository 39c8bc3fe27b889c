//! Error types for the command line

use curator_catalogue::{CatalogueError, ReaderError};
use curator_config::ConfigError;
use curator_manifest::ManifestError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Output file already exists: {} (use --overwrite or --append)", .0.display())]
    OutputExists(PathBuf),

    #[error("Invalid metadata '{0}': expected KEY=VALUE")]
    InvalidMeta(String),

    #[error("{0} errors have occurred")]
    CheckFailed(usize),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use crate::errors::*;

    #[test]
    fn test_cli_error_display() {
        assert_eq!(CliError::CheckFailed(3).to_string(), "3 errors have occurred");
        let err = CliError::OutputExists(PathBuf::from("out.yml"));
        assert!(err.to_string().contains("out.yml"));
    }
}
