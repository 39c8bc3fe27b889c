//! Named dataset post-processing hooks

use crate::dataset::DatasetRecord;
use crate::errors::ManifestError;
use indexmap::IndexMap;
use serde_yaml::Value;

/// A hook applied to a freshly curated dataset
pub type UserFunction = fn(DatasetRecord) -> DatasetRecord;

/// Record the dataset name as its `user`
pub fn add_user(mut dataset: DatasetRecord) -> DatasetRecord {
    dataset
        .metadata
        .insert(Value::String("user".to_string()), Value::String(dataset.name.clone()));
    dataset
}

#[derive(Debug, Clone)]
pub struct UserFunctionRegistry {
    functions: IndexMap<String, UserFunction>,
}

impl Default for UserFunctionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("add_user", add_user);
        registry
    }
}

impl UserFunctionRegistry {
    /// A registry without the built-in hooks
    pub fn empty() -> Self {
        Self {
            functions: IndexMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, function: UserFunction) {
        self.functions.insert(name.into(), function);
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Look a hook up; unknown names are an error
    pub fn get(&self, name: &str) -> Result<UserFunction, ManifestError> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| ManifestError::UnknownUserFunction {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn apply(&self, name: &str, dataset: DatasetRecord) -> Result<DatasetRecord, ManifestError> {
        Ok(self.get(name)?(dataset))
    }
}
