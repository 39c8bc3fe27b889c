//! Object inventory of data files

use crate::errors::CatalogueError;
use crate::reader::{EventFileReader, ObjectNode};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use tracing::{debug, warn};

const UNKNOWN_TYPE: &str = "UNKNOWN";

/// One leaf object of a data file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub interpretation: Option<String>,
    /// Not reported for objects without streamer or interpretation
    pub compressed_bytes: Option<u64>,
    pub uncompressed_bytes: Option<u64>,
    pub has_streamer: bool,
    pub readable: bool,
    pub is_empty: bool,
    pub file: String,
}

/// Column headers in output order
pub const COLUMNS: [&str; 9] = [
    "name",
    "type",
    "interpretation",
    "compressed_bytes",
    "uncompressed_bytes",
    "has_streamer",
    "readable",
    "is_empty",
    "file",
];

/// Append dotted `child` to `parent`, skipping tokens the parent already ends with
fn merge_name(parent: Option<&str>, child: &str) -> String {
    let Some(parent) = parent else {
        return child.to_string();
    };
    child.split('.').fold(parent.to_string(), |name, token| {
        if name.ends_with(token) {
            name
        } else {
            format!("{}.{}", name, token)
        }
    })
}

/// A leaf reached by [`walk`], with its display name and key path
struct Leaf<'a> {
    name: String,
    path: Vec<String>,
    node: &'a ObjectNode,
}

fn walk<'a>(node: &'a ObjectNode, name: Option<&str>, path: &[String], leaves: &mut Vec<Leaf<'a>>) {
    let mut children: Vec<&ObjectNode> = node.children().iter().collect();
    children.sort_by(|a, b| a.name.cmp(&b.name));
    for child in children {
        let child_name = merge_name(name, &child.name);
        let mut child_path = path.to_vec();
        child_path.push(child.name.clone());
        if child.is_leaf() {
            leaves.push(Leaf {
                name: child_name,
                path: child_path,
                node: child,
            });
        } else {
            walk(child, Some(&child_name), &child_path, leaves);
        }
    }
}

/// List the leaf objects of one file
pub fn inspect(reader: &dyn EventFileReader, file: &str) -> Result<Vec<ObjectRecord>, CatalogueError> {
    debug!("Inspecting {}", file);
    let handle = reader.open(file)?;
    let root = handle.root();
    let mut leaves = Vec::new();
    walk(&root, None, &[], &mut leaves);

    let records = leaves
        .into_iter()
        .map(|leaf| {
            let node = leaf.node;
            let type_name = if node.type_name.is_empty() {
                UNKNOWN_TYPE.to_string()
            } else {
                node.type_name.clone()
            };
            let mut record = ObjectRecord {
                name: leaf.name,
                type_name,
                interpretation: node.interpretation.clone(),
                compressed_bytes: None,
                uncompressed_bytes: None,
                has_streamer: node.has_streamer,
                readable: false,
                is_empty: false,
                file: file.to_string(),
            };
            if !node.has_streamer && node.interpretation.is_none() {
                return record;
            }

            match handle.read(&leaf.path) {
                Ok(len) => {
                    record.readable = true;
                    record.is_empty = len == 0;
                }
                Err(e) => warn!("Cannot read {} of type {}: {}", record.name, record.type_name, e),
            }
            record.compressed_bytes = node.compressed_bytes;
            record.uncompressed_bytes = node.uncompressed_bytes;
            record
        })
        .collect();
    Ok(records)
}

/// [`inspect`] over several files, concatenated in input order
pub fn inspect_all(
    reader: &dyn EventFileReader,
    files: &[String],
) -> Result<Vec<ObjectRecord>, CatalogueError> {
    let mut records = Vec::new();
    for file in files {
        records.extend(inspect(reader, file)?);
    }
    Ok(records)
}

/// Keys of the trees stored in `file`
pub fn get_trees(reader: &dyn EventFileReader, file: &str) -> Result<Vec<String>, CatalogueError> {
    Ok(reader.open(file)?.tree_names())
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row(record: &ObjectRecord) -> [String; 9] {
    [
        record.name.clone(),
        record.type_name.clone(),
        cell(record.interpretation.as_ref()),
        cell(record.compressed_bytes),
        cell(record.uncompressed_bytes),
        record.has_streamer.to_string(),
        record.readable.to_string(),
        record.is_empty.to_string(),
        record.file.clone(),
    ]
}

/// Render records as a Markdown table
pub fn render_markdown(records: &[ObjectRecord]) -> String {
    let rows: Vec<[String; 9]> = records.iter().map(row).collect();
    let mut widths = COLUMNS.map(str::len);
    for cells in &rows {
        for (width, value) in widths.iter_mut().zip(cells) {
            *width = (*width).max(value.len());
        }
    }

    let mut out = String::new();
    let mut push_line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(value, width)| format!("{:<width$}", value, width = width))
            .collect();
        let _ = writeln!(out, "| {} |", padded.join(" | "));
    };

    push_line(&COLUMNS.map(str::to_string));
    push_line(&widths.map(|w| "-".repeat(w)));
    for cells in &rows {
        push_line(cells);
    }
    out
}

/// Write records as CSV with a header row
pub fn write_csv<W: Write>(records: &[ObjectRecord], writer: W) -> Result<(), CatalogueError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    if records.is_empty() {
        csv_writer.write_record(COLUMNS)?;
    }
    csv_writer.flush()?;
    Ok(())
}
