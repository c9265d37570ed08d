use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::result::ResultSet;

/// Executes queries against one source.
///
/// A runner is shared by all queries of a source, which run concurrently,
/// so implementations must be safe to invoke from multiple tasks at once.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Runs one query. `filepath` is the query file the content was read from.
    /// Returns `None` when the query produces no output (e.g. DDL statements).
    async fn run(&self, content: &str, filepath: &Path) -> SourceResult<Option<ResultSet>>;
}

/// A trait for creating a [`QueryRunner`] for a specific source type.
#[async_trait]
pub trait RunnerFactory: Send + Sync {
    /// Returns the source type this factory is registered under.
    fn source_type(&self) -> &str;

    /// Creates a runner from the source options and the source directory.
    async fn create(
        &self,
        options: &serde_json::Value,
        source_directory: &Path,
    ) -> SourceResult<Arc<dyn QueryRunner>>;
}
