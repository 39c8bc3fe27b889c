//! Native ROOT backend built on oxyroot
//!
//! Trees are opened once per file and queried in place. Branch types come from
//! the leaves stored in the file, and [`EventFile::read`] decodes the whole
//! branch.

use super::{strip_cycle, EventFile, EventFileReader, ObjectNode};
use crate::errors::ReaderError;
use oxyroot::{Branch, ReaderTree, RootFile};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

const TREE_TYPE: &str = "TTree";
const UNKNOWN_TYPE: &str = "UNKNOWN";

/// Reader for local ROOT files
#[derive(Debug, Clone, Default)]
pub struct RootReader;

impl RootReader {
    pub fn new() -> Self {
        RootReader
    }
}

fn open_error(path: &str, message: impl ToString) -> ReaderError {
    ReaderError::Open {
        path: path.to_string(),
        message: message.to_string(),
    }
}

impl EventFileReader for RootReader {
    fn name(&self) -> &'static str {
        "oxyroot"
    }

    fn open(&self, path: &str) -> Result<Box<dyn EventFile>, ReaderError> {
        debug!("Opening ROOT file: {}", path);
        // oxyroot panics on some corrupt headers
        let mut file = panic::catch_unwind(|| RootFile::open(path))
            .map_err(|_| open_error(path, "not a readable ROOT file"))?
            .map_err(|e| open_error(path, e))?;
        let keys: Vec<String> = file.keys_name().map(|k| k.to_string()).collect();

        let mut trees = Vec::new();
        let mut others = Vec::new();
        for key in keys {
            match file.get_tree(&key) {
                Ok(tree) => trees.push((key, tree)),
                Err(e) => {
                    debug!("{} in {} is not a tree: {}", key, path, e);
                    others.push(key);
                }
            }
        }

        Ok(Box::new(RootEventFile {
            path: path.to_string(),
            trees,
            others,
        }))
    }
}

/// An opened ROOT file
struct RootEventFile {
    path: String,
    trees: Vec<(String, ReaderTree)>,
    others: Vec<String>,
}

impl RootEventFile {
    fn tree(&self, name: &str) -> Result<&ReaderTree, ReaderError> {
        let wanted = strip_cycle(name);
        self.trees
            .iter()
            .find(|(key, _)| key == wanted)
            .map(|(_, tree)| tree)
            .ok_or_else(|| self.no_such_object(name))
    }

    fn no_such_object(&self, object: &str) -> ReaderError {
        ReaderError::NoSuchObject {
            path: self.path.clone(),
            object: object.to_string(),
        }
    }

    fn unreadable(&self, object: &str, message: String) -> ReaderError {
        ReaderError::Unreadable {
            path: self.path.clone(),
            object: object.to_string(),
            message,
        }
    }
}

/// Drop `std::` and blanks so `std::vector<float>` and `vector<float>` agree
fn normalize_type(type_name: &str) -> String {
    type_name.replace("std::", "").replace(' ', "")
}

/// Numpy-style dtype of a fixed-width C++ type
fn dtype(type_name: &str) -> Option<&'static str> {
    let dtype = match type_name {
        "bool" | "Bool_t" => "bool",
        "int8_t" | "char" | "Char_t" => "i1",
        "uint8_t" | "unsignedchar" | "UChar_t" => "u1",
        "int16_t" | "short" | "Short_t" => ">i2",
        "uint16_t" | "unsignedshort" | "UShort_t" => ">u2",
        "int32_t" | "int" | "Int_t" => ">i4",
        "uint32_t" | "unsignedint" | "UInt_t" => ">u4",
        "int64_t" | "long" | "Long64_t" => ">i8",
        "uint64_t" | "unsignedlong" | "ULong64_t" => ">u8",
        "float" | "Float_t" => ">f4",
        "double" | "Double_t" => ">f8",
        _ => return None,
    };
    Some(dtype)
}

/// How the branch content is decoded, `None` when no decoder applies
fn interpretation(type_name: &str) -> Option<String> {
    let normalized = normalize_type(type_name);
    if let Some(inner) = normalized
        .strip_prefix("vector<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return dtype(inner).map(|d| format!("AsJagged(AsDtype('{}'), header_bytes=10)", d));
    }
    match normalized.as_str() {
        "string" | "TString" => Some("AsStrings()".to_string()),
        other => dtype(other).map(|d| format!("AsDtype('{}')", d)),
    }
}

fn branch_node(branch: &Branch) -> ObjectNode {
    let type_name = branch.item_type_name();
    let mut node = ObjectNode::new(branch.name(), type_name.clone())
        .with_streamer(matches!(branch, Branch::Element(_)));
    if let Some(interpretation) = interpretation(&type_name) {
        node = node.with_interpretation(interpretation);
    }
    for child in branch.branches() {
        node = node.with_child(branch_node(child));
    }
    node
}

fn push_branch_names(branch: &Branch, parent: Option<&str>, names: &mut Vec<String>) {
    let name = match parent {
        Some(parent) => format!("{}/{}", parent, branch.name()),
        None => branch.name().to_string(),
    };
    names.push(name.clone());
    for child in branch.branches() {
        push_branch_names(child, Some(&name), names);
    }
}

/// Follow `path` down the sub-branches of `tree`
fn find_branch<'a>(tree: &'a ReaderTree, path: &[String]) -> Option<&'a Branch> {
    let (first, rest) = path.split_first()?;
    let mut branch = tree.branches().find(|b| b.name() == first.as_str())?;
    for name in rest {
        let mut next = None;
        for child in branch.branches() {
            if child.name() == name.as_str() {
                next = Some(child);
                break;
            }
        }
        branch = next?;
    }
    Some(branch)
}

macro_rules! decode_count {
    ($branch:expr, $t:ty) => {
        $branch.as_iter::<$t>().map(|values| values.count())
    };
}

/// Decode every entry of a branch and count them
fn decode(branch: &Branch) -> Result<usize, String> {
    let type_name = normalize_type(&branch.item_type_name());
    let element = type_name
        .strip_prefix("vector<")
        .and_then(|rest| rest.strip_suffix('>'));
    let counted = match (element, dtype(element.unwrap_or(&type_name))) {
        (None, None) if matches!(type_name.as_str(), "string" | "TString") => {
            decode_count!(branch, String)
        }
        (Some(_), Some(">i4")) => decode_count!(branch, Vec<i32>),
        (Some(_), Some(">i8")) => decode_count!(branch, Vec<i64>),
        (Some(_), Some(">f4")) => decode_count!(branch, Vec<f32>),
        (Some(_), Some(">f8")) => decode_count!(branch, Vec<f64>),
        (None, Some("bool")) => decode_count!(branch, bool),
        (None, Some("i1")) => decode_count!(branch, i8),
        (None, Some("u1")) => decode_count!(branch, u8),
        (None, Some(">i2")) => decode_count!(branch, i16),
        (None, Some(">u2")) => decode_count!(branch, u16),
        (None, Some(">i4")) => decode_count!(branch, i32),
        (None, Some(">u4")) => decode_count!(branch, u32),
        (None, Some(">i8")) => decode_count!(branch, i64),
        (None, Some(">u8")) => decode_count!(branch, u64),
        (None, Some(">f4")) => decode_count!(branch, f32),
        (None, Some(">f8")) => decode_count!(branch, f64),
        _ => return Err(format!("no decoder for type '{}'", type_name)),
    };
    counted.map_err(|e| e.to_string())
}

impl EventFile for RootEventFile {
    fn keys(&self, recursive: bool) -> Vec<String> {
        let mut keys = Vec::new();
        for (key, tree) in &self.trees {
            let key = format!("{};1", key);
            keys.push(key.clone());
            if recursive {
                let mut names = Vec::new();
                for branch in tree.branches() {
                    push_branch_names(branch, None, &mut names);
                }
                keys.extend(names.iter().map(|name| format!("{}/{}", key, name)));
            }
        }
        keys.extend(self.others.iter().map(|key| format!("{};1", key)));
        keys
    }

    fn entries(&self, tree: &str) -> Result<u64, ReaderError> {
        let entries = self.tree(tree)?.entries();
        Ok(u64::try_from(entries).unwrap_or(0))
    }

    fn branch_names(&self, tree: &str) -> Result<Vec<String>, ReaderError> {
        let mut names = Vec::new();
        for branch in self.tree(tree)?.branches() {
            push_branch_names(branch, None, &mut names);
        }
        Ok(names)
    }

    fn root(&self) -> ObjectNode {
        let mut root = ObjectNode::new("/", "TDirectory");
        for (key, tree) in &self.trees {
            let mut node = ObjectNode::new(format!("{};1", key), TREE_TYPE).with_streamer(true);
            for branch in tree.branches() {
                node = node.with_child(branch_node(branch));
            }
            root = root.with_child(node);
        }
        for key in &self.others {
            root = root.with_child(ObjectNode::new(format!("{};1", key), UNKNOWN_TYPE));
        }
        root
    }

    fn read(&self, path: &[String]) -> Result<usize, ReaderError> {
        let joined = path.join("/");
        let Some((tree, branch_path)) = path.split_first() else {
            return Err(self.no_such_object(&joined));
        };
        if self.others.iter().any(|key| key == strip_cycle(tree)) {
            return Err(self.unreadable(&joined, "not a tree".to_string()));
        }
        let tree = self.tree(tree)?;
        if branch_path.is_empty() {
            return Ok(usize::try_from(tree.entries()).unwrap_or(0));
        }

        let branch = find_branch(tree, branch_path).ok_or_else(|| self.no_such_object(&joined))?;
        // oxyroot panics on some streamer layouts
        panic::catch_unwind(AssertUnwindSafe(|| decode(branch)))
            .unwrap_or_else(|_| Err("decoder aborted".to_string()))
            .map_err(|message| self.unreadable(&joined, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::inspect;
    use oxyroot::WriterTree;
    use tempfile::TempDir;

    /// A file with one `events` tree of five entries
    fn fixture(dir: &TempDir) -> Option<String> {
        let path = dir.path().join("events.root").to_str()?.to_string();
        let mut file = RootFile::create(&path).ok()?;
        let mut tree = WriterTree::new("events");
        tree.new_branch("nmuon", 0..5_i32);
        tree.new_branch("met", (0..5_i32).map(|i| f64::from(i) * 1.5));
        tree.write(&mut file).ok()?;
        file.close().ok()?;
        Some(path)
    }

    #[test]
    fn test_interpretation() {
        assert_eq!(interpretation("int32_t").as_deref(), Some("AsDtype('>i4')"));
        assert_eq!(interpretation("Double_t").as_deref(), Some("AsDtype('>f8')"));
        assert_eq!(
            interpretation("std::vector<float>").as_deref(),
            Some("AsJagged(AsDtype('>f4'), header_bytes=10)")
        );
        assert_eq!(interpretation("TLorentzVector"), None);
    }

    #[test]
    fn test_open_missing_file() {
        let reader = RootReader::new();
        assert!(matches!(
            reader.open("/nonexistent/events.root"),
            Err(ReaderError::Open { .. })
        ));
    }

    #[test]
    fn test_tree_queries() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let Some(path) = fixture(&dir) else {
            return;
        };
        let Ok(file) = RootReader::new().open(&path) else {
            panic!("written file should open");
        };
        assert_eq!(file.tree_names(), vec!["events;1".to_string()]);
        assert!(file.contains("events"));
        assert!(file.entries("events;1").is_ok_and(|n| n == 5));
        assert!(file
            .branch_names("events")
            .is_ok_and(|names| names.contains(&"nmuon".to_string()) && names.contains(&"met".to_string())));
        assert!(file.keys(true).contains(&"events;1/met".to_string()));
    }

    #[test]
    fn test_inspect_reads_real_branches() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let Some(path) = fixture(&dir) else {
            return;
        };
        let Ok(records) = inspect(&RootReader::new(), &path) else {
            panic!("inspection failed");
        };
        assert_eq!(records.len(), 2);

        let met = records.iter().find(|r| r.name == "events;1.met");
        assert!(met.is_some_and(|r| r.interpretation.as_deref() == Some("AsDtype('>f8')")
            && r.readable
            && !r.is_empty));
        let nmuon = records.iter().find(|r| r.name == "events;1.nmuon");
        assert!(nmuon.is_some_and(|r| r.interpretation.as_deref() == Some("AsDtype('>i4')")
            && r.readable));
    }

    #[test]
    fn test_read_unknown_branch() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let Some(path) = fixture(&dir) else {
            return;
        };
        let Ok(file) = RootReader::new().open(&path) else {
            panic!("written file should open");
        };
        let path = vec!["events;1".to_string(), "jets".to_string()];
        assert!(matches!(file.read(&path), Err(ReaderError::NoSuchObject { .. })));
        let path = vec!["events;1".to_string(), "met".to_string()];
        assert!(file.read(&path).is_ok_and(|n| n == 5));
    }
}
