//! Boundary to the binary data-file format
//!
//! The curator never decodes file contents itself. Everything it needs from a
//! data file (object keys, tree entry counts, branch names, object metadata and
//! a "can this be read" check) goes through the [`EventFileReader`] and
//! [`EventFile`] traits.
//!
//! Backends:
//! - [`memory::MemoryReader`]: in-memory files, used for tests and embedding
//! - `root::RootReader` (feature `root`, on by default): native ROOT files through oxyroot

pub mod memory;
#[cfg(feature = "root")]
pub mod root;

use crate::errors::ReaderError;
use serde::Serialize;

/// Separator between a file path and an object inside it (`file.root:events`)
pub const ADDRESS_SEPARATOR: char = ':';

/// Entry count for one `file:object` address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryCount {
    pub file: String,
    pub object: String,
    pub entries: u64,
}

/// A node of the object hierarchy stored in a data file
///
/// Directories and trees have children, branches and standalone objects
/// (histograms, ...) are leaves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectNode {
    pub name: String,
    pub type_name: String,
    pub interpretation: Option<String>,
    /// Stored sizes, when the backend knows them
    pub compressed_bytes: Option<u64>,
    pub uncompressed_bytes: Option<u64>,
    pub has_streamer: bool,
    pub children: Vec<ObjectNode>,
}

impl ObjectNode {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn with_interpretation(mut self, interpretation: impl Into<String>) -> Self {
        self.interpretation = Some(interpretation.into());
        self
    }

    pub fn with_streamer(mut self, has_streamer: bool) -> Self {
        self.has_streamer = has_streamer;
        self
    }

    pub fn with_bytes(mut self, compressed: u64, uncompressed: u64) -> Self {
        self.compressed_bytes = Some(compressed);
        self.uncompressed_bytes = Some(uncompressed);
        self
    }

    pub fn with_child(mut self, child: ObjectNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(&self) -> &[ObjectNode] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_tree(&self) -> bool {
        self.type_name.contains("TTree")
    }
}

/// An opened data file
pub trait EventFile {
    /// Object keys, with cycle suffix (`events;1`)
    fn keys(&self, recursive: bool) -> Vec<String>;

    /// Whether an object exists; the cycle suffix is optional
    fn contains(&self, name: &str) -> bool {
        let wanted = strip_cycle(name);
        self.keys(true)
            .iter()
            .any(|key| key == name || strip_cycle(key) == wanted)
    }

    /// Number of entries of a tree
    fn entries(&self, tree: &str) -> Result<u64, ReaderError>;

    /// Branch names of a tree, nested branches included
    fn branch_names(&self, tree: &str) -> Result<Vec<String>, ReaderError>;

    /// Root directory of the object hierarchy
    fn root(&self) -> ObjectNode;

    /// Materialize the object at `path` (key names from the root down) and
    /// return its length. Fails when the content cannot be decoded.
    fn read(&self, path: &[String]) -> Result<usize, ReaderError>;

    /// Keys of all trees in the file
    fn tree_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_trees(&self.root(), None, &mut names);
        names
    }
}

fn collect_trees(node: &ObjectNode, parent: Option<&str>, names: &mut Vec<String>) {
    for child in node.children() {
        let key = match parent {
            Some(parent) => format!("{}/{}", parent, child.name),
            None => child.name.clone(),
        };
        if child.is_tree() {
            names.push(key);
        } else if !child.is_leaf() {
            collect_trees(child, Some(&key), names);
        }
    }
}

/// Opens data files
pub trait EventFileReader: Send + Sync {
    /// Short backend name for log messages
    fn name(&self) -> &'static str;

    fn open(&self, path: &str) -> Result<Box<dyn EventFile>, ReaderError>;

    /// Batch entry-count query over `file:tree` addresses
    fn num_entries(&self, addresses: &[String]) -> Result<Vec<EntryCount>, ReaderError> {
        addresses
            .iter()
            .map(|address| {
                let (file, object) = split_address(address).ok_or_else(|| {
                    ReaderError::NoSuchObject {
                        path: address.clone(),
                        object: String::new(),
                    }
                })?;
                let entries = self.open(file)?.entries(object)?;
                Ok(EntryCount {
                    file: file.to_string(),
                    object: object.to_string(),
                    entries,
                })
            })
            .collect()
    }
}

/// Build the `file:object` address
pub fn make_address(file: &str, object: &str) -> String {
    format!("{}{}{}", file, ADDRESS_SEPARATOR, object)
}

/// Split `file:object` at the last separator whose right-hand side is a plain
/// object name. URLs such as `root://host//f.root` are not addresses.
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    let (file, object) = address.rsplit_once(ADDRESS_SEPARATOR)?;
    if file.is_empty() || object.is_empty() || object.contains('/') {
        return None;
    }
    Some((file, object))
}

/// Whether an expanded entry is a `file:object` address rather than a path
pub fn is_address(entry: &str) -> bool {
    entry.contains(ADDRESS_SEPARATOR)
}

/// Drop the `;N` cycle suffix of a key
pub fn strip_cycle(key: &str) -> &str {
    match key.rsplit_once(';') {
        Some((name, cycle)) if !cycle.is_empty() && cycle.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => key,
    }
}

/// The reader used by the command line
pub fn default_reader() -> Result<Box<dyn EventFileReader>, ReaderError> {
    #[cfg(feature = "root")]
    {
        Ok(Box::new(root::RootReader::new()))
    }

    #[cfg(not(feature = "root"))]
    {
        Err(ReaderError::Unavailable(
            "curator was built without ROOT support; rebuild with the default `root` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_address() {
        assert_eq!(
            split_address("/data/f.root:events"),
            Some(("/data/f.root", "events"))
        );
        assert_eq!(split_address("/data/f.root"), None);
        assert_eq!(split_address("root://host//eos/f.root"), None);
        assert_eq!(
            split_address("root://host//eos/f.root:events"),
            Some(("root://host//eos/f.root", "events"))
        );
    }

    #[test]
    fn test_strip_cycle() {
        assert_eq!(strip_cycle("events;1"), "events");
        assert_eq!(strip_cycle("events"), "events");
        assert_eq!(strip_cycle("odd;name"), "odd;name");
    }

    #[test]
    fn test_object_node_tree_detection() {
        let node = ObjectNode::new("events;1", "TTree")
            .with_child(ObjectNode::new("ev", "TBranch").with_streamer(true));
        assert!(node.is_tree());
        assert!(!node.is_leaf());
        assert_eq!(node.children().len(), 1);
        assert!(node.children()[0].is_leaf());
    }
}
