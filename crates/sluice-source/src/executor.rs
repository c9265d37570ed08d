use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use fastrace::Span;
use futures::future::try_join_all;
use sluice_telemetry::common::SpanAttribute;
use sluice_telemetry::futures::TimedFutureExt;
use tokio::fs;

use crate::encoder::{ColumnarEncoder, ParquetEncoder};
use crate::error::{SourceError, SourceResult};
use crate::events::{ExecutionEvents, LogEvents};
use crate::output::{output_subdirectory, OutputLocation};
use crate::registry::RunnerRegistry;
use crate::result::ResultSet;
use crate::runner::RunnerFactory;
use crate::spec::SourceSpec;

/// Runs the queries of a source and writes one data file
/// and one schema file for each query that produced a result.
pub struct SourceExecutor {
    encoder: Arc<dyn ColumnarEncoder>,
    events: Arc<dyn ExecutionEvents>,
}

impl Default for SourceExecutor {
    fn default() -> Self {
        Self {
            encoder: Arc::new(ParquetEncoder::default()),
            events: Arc::new(LogEvents),
        }
    }
}

impl SourceExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ColumnarEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn ExecutionEvents>) -> Self {
        self.events = events;
        self
    }

    /// Executes the source and returns the distinct data file paths
    /// relative to `output_root`, in query order.
    ///
    /// Any failure aborts the source. Outputs written before the failure are kept.
    pub async fn execute(
        &self,
        source: &SourceSpec,
        registry: &RunnerRegistry,
        output_root: &Path,
    ) -> SourceResult<Vec<String>> {
        let factory = registry.get(&source.source_type)?;
        let results = self.run_queries(source, factory.as_ref()).await?;
        self.write_outputs(source, results, output_root).await
    }

    async fn run_queries(
        &self,
        source: &SourceSpec,
        factory: &dyn RunnerFactory,
    ) -> SourceResult<Vec<Option<ResultSet>>> {
        let runner = factory
            .create(&source.options, &source.source_directory)
            .await?;
        let runner = runner.as_ref();
        let events = self.events.as_ref();

        events.source_started(source);
        let results = try_join_all(source.queries.iter().map(|query| {
            let span = Span::enter_with_local_parent("run_query").with_properties(|| {
                [
                    (SpanAttribute::SOURCE_NAME, source.name.clone()),
                    (SpanAttribute::SOURCE_TYPE, source.source_type.clone()),
                    (SpanAttribute::QUERY_NAME, query.name.clone()),
                    (
                        SpanAttribute::QUERY_PATH,
                        query.filepath.display().to_string(),
                    ),
                ]
            });
            events.query_started(source, query);
            async move { runner.run(&query.content, &query.filepath).await }.in_span_with_timer(
                span,
                move |result, elapsed| {
                    if result.is_ok() {
                        events.query_finished(source, query, elapsed);
                    }
                },
            )
        }))
        .await?;
        events.source_finished(source);
        Ok(results)
    }

    async fn write_outputs(
        &self,
        source: &SourceSpec,
        results: Vec<Option<ResultSet>>,
        output_root: &Path,
    ) -> SourceResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut outputs = Vec::new();

        for (query, result) in source.queries.iter().zip(results) {
            let Some(result) = result else {
                continue;
            };
            if result.column_types.is_empty() {
                continue;
            }
            let subdirectory = output_subdirectory(&source.source_directory, &query.filepath)?;
            let location = OutputLocation::new(
                output_root,
                &subdirectory,
                &query.name,
                self.encoder.extension(),
            )?;
            let schema = serde_json::to_vec(&result.column_types)?;
            let encoder = Arc::clone(&self.encoder);
            let data = tokio::task::spawn_blocking(move || {
                encoder.encode(&result.column_types, &result.rows)
            })
            .await
            .map_err(|e| SourceError::internal(e.to_string()))??;

            if seen.insert(location.url_path.clone()) {
                outputs.push(location.url_path.clone());
            }
            fs::create_dir_all(&location.directory).await?;
            fs::write(&location.data_file, &data).await?;
            fs::write(&location.schema_file, &schema).await?;
            self.events.output_written(source, query, &location.data_file);
        }

        Ok(outputs)
    }
}

/// Executes the source with the Parquet encoder and log-based progress reporting.
pub async fn execute_source(
    source: &SourceSpec,
    registry: &RunnerRegistry,
    output_root: &Path,
) -> SourceResult<Vec<String>> {
    SourceExecutor::default()
        .execute(source, registry, output_root)
        .await
}
