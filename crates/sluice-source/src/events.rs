use std::path::Path;
use std::time::Duration;

use log::{debug, info};

use crate::spec::{QuerySpec, SourceSpec};

/// Progress notifications emitted while a source is executed.
///
/// Events have no effect on the execution itself.
/// All methods default to doing nothing.
pub trait ExecutionEvents: Send + Sync {
    fn source_started(&self, _source: &SourceSpec) {}

    fn query_started(&self, _source: &SourceSpec, _query: &QuerySpec) {}

    /// Called only for queries that succeeded.
    fn query_finished(&self, _source: &SourceSpec, _query: &QuerySpec, _elapsed: Duration) {}

    /// Called once all queries of the source have succeeded.
    fn source_finished(&self, _source: &SourceSpec) {}

    fn output_written(&self, _source: &SourceSpec, _query: &QuerySpec, _data_file: &Path) {}
}

/// Discards all events.
pub struct NoopEvents;

impl ExecutionEvents for NoopEvents {}

/// Reports events as log records.
pub struct LogEvents;

impl ExecutionEvents for LogEvents {
    fn source_started(&self, source: &SourceSpec) {
        info!("Executing {}", source.name);
    }

    fn query_started(&self, _source: &SourceSpec, query: &QuerySpec) {
        info!(" >| Executing {}", query.filename());
    }

    fn query_finished(&self, _source: &SourceSpec, query: &QuerySpec, elapsed: Duration) {
        info!(
            " <| Finished {} (took {:.2}ms)",
            query.filename(),
            elapsed.as_secs_f64() * 1000.0
        );
    }

    fn source_finished(&self, source: &SourceSpec) {
        info!("Finished {}", source.name);
    }

    fn output_written(&self, _source: &SourceSpec, query: &QuerySpec, data_file: &Path) {
        debug!("wrote {} to {}", query.name, data_file.display());
    }
}
