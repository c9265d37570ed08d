use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A source to execute: the runner to use and the queries to run against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    /// The key of the runner factory in the registry.
    #[serde(rename = "type")]
    pub source_type: String,
    pub name: String,
    /// Runner-specific configuration, passed to the factory as is.
    #[serde(default)]
    pub options: serde_json::Value,
    pub source_directory: PathBuf,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// The query file. Its directory determines where the output goes.
    pub filepath: PathBuf,
    pub content: String,
    /// The output file name without extension.
    pub name: String,
}

impl QuerySpec {
    /// The file name of the query, used in progress messages.
    pub fn filename(&self) -> String {
        self.filepath
            .file_name()
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}
