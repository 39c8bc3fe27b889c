//! File list expanders
//!
//! An expander turns user supplied file patterns into a concrete, ordered list
//! of files and then validates that list against the trees it should contain.

use crate::errors::CatalogueError;
use crate::reader::EventFileReader;
use crate::validation::{check_entries, ValidationPolicy, ValidationResult};
use crate::xrootd::XrdClient;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Strategy for resolving file patterns
pub trait Expander: Send + Sync {
    /// Name under which the expander is registered
    fn name(&self) -> &'static str;

    /// Verify runtime prerequisites
    fn check_setup(&self) -> bool;

    /// Expand the patterns, joining relative ones onto `prefix`
    fn expand(&self, patterns: &[String], prefix: Option<&str>)
        -> Result<Vec<String>, CatalogueError>;

    /// Count entries and drop files that fail the policy
    fn validate(
        &self,
        reader: &dyn EventFileReader,
        files: Vec<String>,
        trees: &[String],
        policy: ValidationPolicy,
    ) -> Result<ValidationResult, CatalogueError> {
        check_entries(reader, files, trees, policy)
    }
}

/// Whether a pattern names an access scheme (`root://...`)
pub fn has_scheme(pattern: &str) -> bool {
    let Some((scheme, _)) = pattern.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Shared expansion algorithm
///
/// Patterns with a scheme or an absolute path are globbed as given; others are
/// joined onto `prefix` when one is set and normalized relative to the working
/// directory otherwise. Matches are appended in pattern order, and a pattern
/// without matches contributes nothing.
pub fn expand_file_list_generic<G>(
    patterns: &[String],
    prefix: Option<&str>,
    mut glob: G,
) -> Result<Vec<String>, CatalogueError>
where
    G: FnMut(&str) -> Result<Vec<String>, CatalogueError>,
{
    let mut full_list = Vec::new();
    for pattern in patterns {
        let path = if has_scheme(pattern) || Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            match prefix.filter(|p| !p.is_empty()) {
                Some(prefix) => Path::new(prefix).join(pattern).to_string_lossy().to_string(),
                None => normalize_relative(pattern),
            }
        };
        let expanded = glob(&path)?;
        debug!("Pattern '{}' matched {} file(s)", path, expanded.len());
        full_list.extend(expanded);
    }
    Ok(full_list)
}

/// Collapse `.` and `dir/..` in a relative path without touching the file system
fn normalize_relative(pattern: &str) -> String {
    let mut parts: Vec<Component> = Vec::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(parts.last(), Some(Component::Normal(_))) => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return ".".to_string();
    }
    parts.iter().collect::<PathBuf>().to_string_lossy().to_string()
}

/// Glob on the local file system
pub fn local_glob(pattern: &str) -> Result<Vec<String>, CatalogueError> {
    let paths = glob::glob(pattern).map_err(|e| CatalogueError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut matches = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => matches.push(path.to_string_lossy().to_string()),
            Err(e) => warn!("Skipping unreadable path while globbing '{}': {}", pattern, e),
        }
    }
    Ok(matches)
}

/// Expand wild-carded paths on the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGlobExpander;

impl Expander for LocalGlobExpander {
    fn name(&self) -> &'static str {
        "local"
    }

    fn check_setup(&self) -> bool {
        true
    }

    fn expand(
        &self,
        patterns: &[String],
        prefix: Option<&str>,
    ) -> Result<Vec<String>, CatalogueError> {
        expand_file_list_generic(patterns, prefix, local_glob)
    }
}

/// Expand wild-carded paths, including files served over xrootd
///
/// Remote patterns need the `xrdfs` client. Without it the expander degrades
/// to local globbing and says so.
#[derive(Debug, Clone, Default)]
pub struct XrootdExpander {
    client: Option<XrdClient>,
}

impl XrootdExpander {
    /// Look up the xrootd client on `PATH`
    pub fn new() -> Self {
        Self {
            client: XrdClient::locate(),
        }
    }

    pub fn with_client(client: Option<XrdClient>) -> Self {
        Self { client }
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }
}

impl Expander for XrootdExpander {
    fn name(&self) -> &'static str {
        "xrootd"
    }

    fn check_setup(&self) -> bool {
        true
    }

    fn expand(
        &self,
        patterns: &[String],
        prefix: Option<&str>,
    ) -> Result<Vec<String>, CatalogueError> {
        match &self.client {
            Some(client) => expand_file_list_generic(patterns, prefix, |p| client.glob(p)),
            None => {
                warn!("XRootD client not found. Falling back to local file list expansion.");
                expand_file_list_generic(patterns, prefix, local_glob)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_expand_file_list_generic_joins_prefix() {
        let result = expand_file_list_generic(&strings(&["file1", "file2"]), Some("prefix"), |x| {
            Ok(vec![format!("{}_expanded", x)])
        });
        assert!(result.is_ok_and(|r| r == strings(&["prefix/file1_expanded", "prefix/file2_expanded"])));
    }

    #[test]
    fn test_scheme_and_absolute_patterns_ignore_prefix() {
        let mut seen = Vec::new();
        let result = expand_file_list_generic(
            &strings(&["data/*.bin", "proto://x/*.bin", "/abs/*.bin"]),
            Some("/base"),
            |x| {
                seen.push(x.to_string());
                Ok(Vec::new())
            },
        );
        assert!(result.is_ok_and(|r| r.is_empty()));
        assert_eq!(seen, strings(&["/base/data/*.bin", "proto://x/*.bin", "/abs/*.bin"]));
    }

    #[test]
    fn test_no_prefix_keeps_relative_pattern() {
        let mut seen = Vec::new();
        let result = expand_file_list_generic(&strings(&["data/*.bin"]), None, |x| {
            seen.push(x.to_string());
            Ok(vec![x.to_string()])
        });
        assert!(result.is_ok_and(|r| r.len() == 1));
        assert_eq!(seen, strings(&["data/*.bin"]));
    }

    #[test]
    fn test_no_prefix_normalizes_relative_pattern() {
        let mut seen = Vec::new();
        let patterns = strings(&["./a/../b/*.root", "data//x/./*.root", "../up/*.root", "a/.."]);
        let result = expand_file_list_generic(&patterns, None, |x| {
            seen.push(x.to_string());
            Ok(Vec::new())
        });
        assert!(result.is_ok());
        assert_eq!(seen, strings(&["b/*.root", "data/x/*.root", "../up/*.root", "."]));
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("root://eospublic.cern.ch//eos/file.root"));
        assert!(has_scheme("xrootd://host/path"));
        assert!(!has_scheme("/data/file.root"));
        assert!(!has_scheme("data/file.root:events"));
        assert!(!has_scheme("://nothing"));
    }

    #[test]
    fn test_local_expander_globs_directory() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        for name in ["b.root", "a.root", "notes.txt"] {
            if fs::write(dir.path().join(name), b"").is_err() {
                return;
            }
        }
        let prefix = dir.path().to_string_lossy().to_string();

        let result = LocalGlobExpander.expand(&strings(&["*.root", "missing*.root"]), Some(&prefix));
        let Ok(files) = result else {
            panic!("local expansion failed");
        };
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.root"));
        assert!(files[1].ends_with("b.root"));
    }

    #[test]
    fn test_xrootd_without_client_falls_back_to_local() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        if fs::write(dir.path().join("events_100.root"), b"").is_err() {
            return;
        }
        let pattern = dir.path().join("*.root").to_string_lossy().to_string();

        let expander = XrootdExpander::with_client(None);
        assert!(expander.check_setup());
        assert!(!expander.has_client());
        let result = expander.expand(&[pattern], None);
        assert!(result.is_ok_and(|r| r.len() == 1));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = local_glob("data/[*.root");
        assert!(matches!(result, Err(CatalogueError::Pattern { .. })));
    }
}
