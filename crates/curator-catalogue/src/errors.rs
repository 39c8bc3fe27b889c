use indexmap::IndexMap;
use std::io;
use thiserror::Error;

/// Errors raised by a data-file reader backend
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Cannot open '{path}': {message}")]
    Open { path: String, message: String },

    #[error("No object '{object}' in '{path}'")]
    NoSuchObject { path: String, object: String },

    #[error("Cannot read '{object}' in '{path}': {message}")]
    Unreadable {
        path: String,
        object: String,
        message: String,
    },

    #[error("No data-file reader available: {0}")]
    Unavailable(String),
}

/// Errors that can occur while expanding or validating file lists
#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("{0}")]
    Configuration(String),

    /// One or more requested trees are absent from one or more files
    #[error("{}", missing_trees_message(.missing))]
    MissingTrees { missing: IndexMap<String, Vec<String>> },

    #[error("Invalid file pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Remote listing failed for '{url}': {message}")]
    Remote { url: String, message: String },

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CatalogueError {
    /// Union of all files missing at least one tree, first-seen order
    pub fn missing_files(&self) -> Vec<&str> {
        match self {
            CatalogueError::MissingTrees { missing } => missing_file_union(missing),
            _ => Vec::new(),
        }
    }
}

fn missing_file_union(missing: &IndexMap<String, Vec<String>>) -> Vec<&str> {
    let mut files: Vec<&str> = Vec::new();
    for file in missing.values().flatten() {
        if !files.contains(&file.as_str()) {
            files.push(file);
        }
    }
    files
}

fn missing_trees_message(missing: &IndexMap<String, Vec<String>>) -> String {
    let trees: Vec<&str> = missing.keys().map(String::as_str).collect();
    let per_tree: Vec<String> = missing
        .iter()
        .map(|(tree, files)| format!("{}: {} ({})", tree, files.len(), files.join(", ")))
        .collect();
    let files = missing_file_union(missing);
    format!(
        "Missing at least one tree ({}) for {} file(s): {}; {}",
        trees.join(", "),
        files.len(),
        files.join(", "),
        per_tree.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_trees_message_deduplicates_files() {
        let mut missing = IndexMap::new();
        missing.insert(
            "events".to_string(),
            vec!["a.root".to_string(), "b.root".to_string()],
        );
        missing.insert("lumi".to_string(), vec!["b.root".to_string()]);
        let err = CatalogueError::MissingTrees { missing };

        assert_eq!(
            err.to_string(),
            "Missing at least one tree (events, lumi) for 2 file(s): a.root, b.root; \
             events: 2 (a.root, b.root); lumi: 1 (b.root)"
        );
        assert_eq!(err.missing_files(), vec!["a.root", "b.root"]);
    }
}
