//! Curator Catalogue
//!
//! Resolves file patterns (local or served over xrootd) into concrete file
//! lists, validates them against the trees they should contain and counts
//! their events. Data files are only ever touched through the reader traits in
//! [`reader`].

pub mod errors;
pub mod expander;
pub mod inspect;
pub mod reader;
pub mod registry;
pub mod validation;
pub mod xrootd;

pub use errors::{CatalogueError, ReaderError};
pub use expander::{expand_file_list_generic, Expander, LocalGlobExpander, XrootdExpander};
pub use inspect::{get_trees, inspect, inspect_all, render_markdown, write_csv, ObjectRecord};
pub use reader::memory::{MemoryFile, MemoryReader};
pub use reader::{default_reader, EntryCount, EventFile, EventFileReader, ObjectNode};
pub use registry::{get_file_list_expander, ExpanderKind, DEFAULT_EXPANDER};
pub use validation::{
    check_entries, num_entries, EventCount, TreeCounts, ValidationPolicy, ValidationResult,
};
