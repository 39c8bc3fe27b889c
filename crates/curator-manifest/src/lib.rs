//! Curator Manifest
//!
//! Dataset records and the YAML manifests that hold them: building a record
//! from file patterns, loading manifests with imports and defaults, lifting
//! shared values into a `defaults` block and writing the result.

pub mod check;
pub mod curate;
pub mod dataset;
pub mod defaults;
pub mod errors;
pub mod prefix;
pub mod read;
pub mod user_functions;
pub mod write;

pub use check::{check_manifests, CheckIssue, CheckReport, DatasetSummary};
pub use curate::{curate, curate_all, CurateInput};
pub use dataset::{DatasetRecord, TreeSpec};
pub use defaults::{prepare_contents, select_default, ManifestDocument};
pub use errors::ManifestError;
pub use prefix::{apply_prefix, Prefix};
pub use read::{from_yaml, LoadOptions};
pub use user_functions::{UserFunction, UserFunctionRegistry};
pub use write::{add_meta, prepare_file_list, write_yaml, FileListRequest, WriteOptions};
