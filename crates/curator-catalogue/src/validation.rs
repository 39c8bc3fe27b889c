//! Tree validation and entry counting
//!
//! Trees are processed strictly in the order given. With empty files
//! disallowed, a file dropped while checking one tree is no longer seen when
//! the next tree is checked; the candidate list is threaded through the trees
//! as an explicit [`ValidationState`] accumulator.

use crate::errors::CatalogueError;
use crate::expander::has_scheme;
use crate::reader::{make_address, split_address, EventFileReader};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What to do with files that fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Drop files with no entries in a requested tree
    pub disallow_empty: bool,
    /// Fail when a requested tree is absent from a file (implies `disallow_empty`)
    pub confirm_tree: bool,
    /// Collect branch inventories per tree
    pub list_branches: bool,
    /// Silently drop files that cannot be read
    pub ignore_inaccessible: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            disallow_empty: true,
            confirm_tree: true,
            list_branches: false,
            ignore_inaccessible: false,
        }
    }
}

/// Entry counts keyed by tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeCounts {
    /// One total per tree (empty files disallowed)
    Totals(IndexMap<String, u64>),
    /// One count per file per tree
    PerFile(IndexMap<String, IndexMap<String, u64>>),
}

/// Serialized form of event counts
///
/// A single requested tree collapses to its inner value: a total, or a
/// per-file mapping. Several trees give a per-tree mapping of either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventCount {
    Total(u64),
    PerKey(IndexMap<String, u64>),
    Nested(IndexMap<String, IndexMap<String, u64>>),
}

impl EventCount {
    /// Sum over everything counted
    pub fn total(&self) -> u64 {
        match self {
            EventCount::Total(n) => *n,
            EventCount::PerKey(counts) => counts.values().sum(),
            EventCount::Nested(counts) => counts.values().flat_map(|c| c.values()).sum(),
        }
    }
}

impl Default for EventCount {
    fn default() -> Self {
        EventCount::Total(0)
    }
}

/// Files surviving validation with their counts and branch inventories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub files: Vec<String>,
    pub counts: TreeCounts,
    /// tree -> branch -> number of files containing the branch
    pub branches: IndexMap<String, IndexMap<String, usize>>,
}

impl ValidationResult {
    pub fn n_events(&self) -> EventCount {
        match &self.counts {
            TreeCounts::Totals(totals) if totals.len() == 1 => {
                EventCount::Total(totals.values().sum())
            }
            TreeCounts::Totals(totals) => EventCount::PerKey(totals.clone()),
            TreeCounts::PerFile(per_tree) => match per_tree.values().next() {
                Some(per_file) if per_tree.len() == 1 => EventCount::PerKey(per_file.clone()),
                _ => EventCount::Nested(per_tree.clone()),
            },
        }
    }
}

/// Entry count of one tree in one file
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileEntries {
    file: String,
    entries: u64,
    has_tree: bool,
}

fn count_entries(
    reader: &dyn EventFileReader,
    files: &[String],
    tree: &str,
) -> Result<Vec<FileEntries>, CatalogueError> {
    let mut counts: IndexMap<String, FileEntries> = IndexMap::new();
    let mut addresses = Vec::new();
    for file in files {
        let has_tree = reader.open(file)?.contains(tree);
        if has_tree {
            addresses.push(make_address(file, tree));
        } else {
            debug!("Tree '{}' not found in {}", tree, file);
        }
        counts.insert(
            file.clone(),
            FileEntries {
                file: file.clone(),
                entries: 0,
                has_tree,
            },
        );
    }

    if !addresses.is_empty() {
        for count in reader.num_entries(&addresses)? {
            if let Some(entry) = counts.get_mut(&count.file) {
                entry.entries = count.entries;
            }
        }
    }

    Ok(counts.into_values().collect())
}

/// Entries of `tree` per file; files without the tree count as 0
pub fn num_entries(
    reader: &dyn EventFileReader,
    files: &[String],
    tree: &str,
) -> Result<IndexMap<String, u64>, CatalogueError> {
    Ok(count_entries(reader, files, tree)?
        .into_iter()
        .map(|e| (e.file, e.entries))
        .collect())
}

/// Accumulator threaded through the per-tree passes
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    files: Vec<String>,
    totals: IndexMap<String, u64>,
    missing: IndexMap<String, Vec<String>>,
}

impl ValidationState {
    pub fn new(files: Vec<String>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Count one tree over the current candidates and drop empty files
    pub fn apply_tree(
        self,
        reader: &dyn EventFileReader,
        tree: &str,
        confirm_tree: bool,
    ) -> Result<Self, CatalogueError> {
        let Self {
            mut files,
            mut totals,
            mut missing,
        } = self;

        let mut total = 0;
        for entry in count_entries(reader, &files, tree)? {
            total += entry.entries;
            if entry.entries == 0 {
                debug!("Dropping {}: no entries in '{}'", entry.file, tree);
                files.retain(|f| f != &entry.file);
                if confirm_tree && !entry.has_tree {
                    missing.entry(tree.to_string()).or_default().push(entry.file);
                }
            }
        }
        *totals.entry(tree.to_string()).or_insert(0) += total;

        Ok(Self {
            files,
            totals,
            missing,
        })
    }
}

fn is_accessible(entry: &str) -> bool {
    if has_scheme(entry) {
        return true;
    }
    let path = split_address(entry).map_or(entry, |(file, _)| file);
    std::fs::File::open(path).is_ok()
}

fn collect_branches(
    reader: &dyn EventFileReader,
    files: &[String],
    trees: &[String],
) -> Result<IndexMap<String, IndexMap<String, usize>>, CatalogueError> {
    let mut branches = IndexMap::new();
    for tree in trees {
        let mut counter: IndexMap<String, usize> = IndexMap::new();
        for file in files {
            let handle = reader.open(file)?;
            if !handle.contains(tree) {
                continue;
            }
            for branch in handle.branch_names(tree)? {
                *counter.entry(branch).or_insert(0) += 1;
            }
        }
        branches.insert(tree.clone(), counter);
    }
    Ok(branches)
}

/// Validate `files` against `trees` following `policy`
pub fn check_entries(
    reader: &dyn EventFileReader,
    files: Vec<String>,
    trees: &[String],
    policy: ValidationPolicy,
) -> Result<ValidationResult, CatalogueError> {
    let disallow_empty = policy.disallow_empty || policy.confirm_tree;

    let files = if policy.ignore_inaccessible {
        let before = files.len();
        let accessible: Vec<String> = files.into_iter().filter(|f| is_accessible(f)).collect();
        debug!("Ignoring {} inaccessible file(s)", before - accessible.len());
        accessible
    } else {
        files
    };

    let (files, counts) = if disallow_empty {
        let state = trees.iter().try_fold(ValidationState::new(files), |state, tree| {
            state.apply_tree(reader, tree, policy.confirm_tree)
        })?;
        if !state.missing.is_empty() {
            return Err(CatalogueError::MissingTrees {
                missing: state.missing,
            });
        }
        (state.files, TreeCounts::Totals(state.totals))
    } else {
        let mut per_tree = IndexMap::new();
        for tree in trees {
            per_tree.insert(tree.clone(), num_entries(reader, &files, tree)?);
        }
        (files, TreeCounts::PerFile(per_tree))
    };

    let branches = if policy.list_branches {
        collect_branches(reader, &files, trees)?
    } else {
        IndexMap::new()
    };

    info!(
        "Validated {} file(s) against tree(s): {}",
        files.len(),
        trees.join(", ")
    );
    Ok(ValidationResult {
        files,
        counts,
        branches,
    })
}
