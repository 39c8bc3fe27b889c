//! In-memory reader backend
//!
//! Files are registered by path with a small builder describing their trees and
//! other objects. Every branch is a 4-byte integer column. Nothing is read from disk, so the registered paths only need
//! to match what the expander produces.

use super::{strip_cycle, EventFile, EventFileReader, ObjectNode};
use crate::errors::ReaderError;
use std::collections::{HashMap, HashSet};

const DEFAULT_INTERPRETATION: &str = "AsDtype('>i4')";
const BYTES_PER_ENTRY: u64 = 4;

#[derive(Debug, Clone, Default)]
struct MemoryTree {
    name: String,
    entries: u64,
    branches: Vec<String>,
}

/// Description of one in-memory data file
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    trees: Vec<MemoryTree>,
    objects: Vec<ObjectNode>,
    unreadable: HashSet<String>,
}

impl MemoryFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tree with `entries` entries and the given branches
    pub fn with_tree(mut self, name: &str, entries: u64, branches: &[&str]) -> Self {
        self.trees.push(MemoryTree {
            name: name.to_string(),
            entries,
            branches: branches.iter().map(|b| (*b).to_string()).collect(),
        });
        self
    }

    /// Add a non-tree object (histogram, directory, ...)
    pub fn with_object(mut self, object: ObjectNode) -> Self {
        self.objects.push(object);
        self
    }

    /// Make reading the object at `path` (`tree;1/branch`) fail
    pub fn with_unreadable(mut self, path: &str) -> Self {
        self.unreadable.insert(path.to_string());
        self
    }

    /// Open this description under `path`
    fn into_event_file(self, path: &str) -> Box<dyn EventFile> {
        Box::new(OpenedMemoryFile {
            path: path.to_string(),
            file: self,
        })
    }

    fn tree(&self, name: &str) -> Option<&MemoryTree> {
        let wanted = strip_cycle(name);
        self.trees.iter().find(|t| t.name == wanted)
    }

    fn tree_node(tree: &MemoryTree) -> ObjectNode {
        let bytes = tree.entries * BYTES_PER_ENTRY;
        tree.branches.iter().fold(
            ObjectNode::new(format!("{};1", tree.name), "TTree").with_streamer(true),
            |node, branch| {
                node.with_child(
                    ObjectNode::new(branch.clone(), "int32_t")
                        .with_interpretation(DEFAULT_INTERPRETATION)
                        .with_streamer(true)
                        .with_bytes(bytes, bytes),
                )
            },
        )
    }
}

/// A [`MemoryFile`] opened under a concrete path
struct OpenedMemoryFile {
    path: String,
    file: MemoryFile,
}

impl OpenedMemoryFile {
    fn no_such_object(&self, object: &str) -> ReaderError {
        ReaderError::NoSuchObject {
            path: self.path.clone(),
            object: object.to_string(),
        }
    }
}

fn push_keys(node: &ObjectNode, parent: Option<&str>, recursive: bool, keys: &mut Vec<String>) {
    let key = match parent {
        Some(parent) => format!("{}/{}", parent, node.name),
        None => node.name.clone(),
    };
    keys.push(key.clone());
    if recursive && !node.is_tree() {
        for child in node.children() {
            push_keys(child, Some(&key), recursive, keys);
        }
    }
}

impl EventFile for OpenedMemoryFile {
    fn keys(&self, recursive: bool) -> Vec<String> {
        let mut keys: Vec<String> = self
            .file
            .trees
            .iter()
            .map(|t| format!("{};1", t.name))
            .collect();
        for object in &self.file.objects {
            push_keys(object, None, recursive, &mut keys);
        }
        keys
    }

    fn entries(&self, tree: &str) -> Result<u64, ReaderError> {
        self.file
            .tree(tree)
            .map(|t| t.entries)
            .ok_or_else(|| self.no_such_object(tree))
    }

    fn branch_names(&self, tree: &str) -> Result<Vec<String>, ReaderError> {
        self.file
            .tree(tree)
            .map(|t| t.branches.clone())
            .ok_or_else(|| self.no_such_object(tree))
    }

    fn root(&self) -> ObjectNode {
        let root = ObjectNode::new("/", "TDirectory");
        let root = self
            .file
            .trees
            .iter()
            .fold(root, |root, tree| root.with_child(MemoryFile::tree_node(tree)));
        self.file
            .objects
            .iter()
            .fold(root, |root, object| root.with_child(object.clone()))
    }

    fn read(&self, path: &[String]) -> Result<usize, ReaderError> {
        let joined = path.join("/");
        if self.file.unreadable.contains(&joined) {
            return Err(ReaderError::Unreadable {
                path: self.path.clone(),
                object: joined,
                message: "unsupported streamer layout".to_string(),
            });
        }

        match path {
            [tree, branch] => {
                let tree = self.file.tree(tree).ok_or_else(|| self.no_such_object(&joined))?;
                if tree.branches.iter().any(|b| b == branch) {
                    Ok(tree.entries as usize)
                } else {
                    Err(self.no_such_object(&joined))
                }
            }
            [name] => match self.file.tree(name) {
                Some(tree) => Ok(tree.entries as usize),
                None if self.file.objects.iter().any(|o| &o.name == name) => Ok(1),
                None => Err(self.no_such_object(&joined)),
            },
            _ => Err(self.no_such_object(&joined)),
        }
    }
}

/// Reader over a fixed set of in-memory files
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: HashMap<String, MemoryFile>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, file: MemoryFile) -> Self {
        self.insert(path, file);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, file: MemoryFile) {
        self.files.insert(path.into(), file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl EventFileReader for MemoryReader {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self, path: &str) -> Result<Box<dyn EventFile>, ReaderError> {
        let file = self.files.get(path).ok_or_else(|| ReaderError::Open {
            path: path.to_string(),
            message: "file not registered".to_string(),
        })?;
        Ok(file.clone().into_event_file(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::make_address;

    fn reader() -> MemoryReader {
        MemoryReader::new()
            .with_file("a.root", MemoryFile::new().with_tree("events", 100, &["ev"]))
            .with_file(
                "b.root",
                MemoryFile::new().with_object(ObjectNode::new("hist;1", "TH1F").with_streamer(true)),
            )
    }

    #[test]
    fn test_contains_with_and_without_cycle() {
        let Ok(file) = reader().open("a.root") else {
            panic!("a.root should open");
        };
        assert!(file.contains("events"));
        assert!(file.contains("events;1"));
        assert!(!file.contains("other"));
    }

    #[test]
    fn test_batch_num_entries() {
        let counts = reader().num_entries(&[make_address("a.root", "events")]);
        assert!(counts.is_ok_and(|c| c.len() == 1 && c[0].entries == 100 && c[0].file == "a.root"));
    }

    #[test]
    fn test_unknown_file() {
        assert!(matches!(
            reader().open("missing.root"),
            Err(ReaderError::Open { .. })
        ));
    }

    #[test]
    fn test_tree_names() {
        let Ok(file) = reader().open("a.root") else {
            panic!("a.root should open");
        };
        assert_eq!(file.tree_names(), vec!["events;1".to_string()]);

        let Ok(file) = reader().open("b.root") else {
            panic!("b.root should open");
        };
        assert!(file.tree_names().is_empty());
        assert_eq!(file.keys(false), vec!["hist;1".to_string()]);
    }
}
