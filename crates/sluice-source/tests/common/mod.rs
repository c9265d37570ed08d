#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sluice_source::error::{SourceError, SourceResult};
use sluice_source::events::ExecutionEvents;
use sluice_source::result::ResultSet;
use sluice_source::runner::{QueryRunner, RunnerFactory};
use sluice_source::runners::inline::InlineRunner;
use sluice_source::spec::{QuerySpec, SourceSpec};
use tokio::sync::Barrier;

pub const TEST_SOURCE_TYPE: &str = "test";

/// Query content that makes the test runner fail.
pub const FAILING_QUERY: &str = "FAIL";

/// Creates runners that serve inline results, fail on [`FAILING_QUERY`],
/// and optionally wait until a number of queries are running at the same time.
#[derive(Default)]
pub struct TestRunnerFactory {
    created: AtomicUsize,
    executed: Arc<AtomicUsize>,
    barrier: Option<Arc<Barrier>>,
}

impl TestRunnerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_barrier(concurrency: usize) -> Self {
        Self {
            barrier: Some(Arc::new(Barrier::new(concurrency))),
            ..Default::default()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunnerFactory for TestRunnerFactory {
    fn source_type(&self) -> &str {
        TEST_SOURCE_TYPE
    }

    async fn create(
        &self,
        _options: &serde_json::Value,
        _source_directory: &Path,
    ) -> SourceResult<Arc<dyn QueryRunner>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TestRunner {
            executed: Arc::clone(&self.executed),
            barrier: self.barrier.clone(),
        }))
    }
}

struct TestRunner {
    executed: Arc<AtomicUsize>,
    barrier: Option<Arc<Barrier>>,
}

#[async_trait]
impl QueryRunner for TestRunner {
    async fn run(&self, content: &str, filepath: &Path) -> SourceResult<Option<ResultSet>> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if content == FAILING_QUERY {
            // Give the other queries a chance to finish first.
            tokio::time::sleep(Duration::from_millis(10)).await;
            return Err(SourceError::execution(format!(
                "{} failed",
                filepath.display()
            )));
        }
        InlineRunner.run(content, filepath).await
    }
}

/// Inline result content with a single number column `n`.
pub fn numbers(values: &[f64]) -> String {
    let rows = values
        .iter()
        .map(|x| format!("[{x}]"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"{{"columnTypes":[{{"name":"n","evidenceType":"number","typeFidelity":"precise"}}],"rows":[{rows}]}}"#
    )
}

pub fn query(filepath: impl Into<PathBuf>, name: &str, content: impl Into<String>) -> QuerySpec {
    QuerySpec {
        filepath: filepath.into(),
        content: content.into(),
        name: name.to_string(),
    }
}

pub fn source(
    source_type: &str,
    source_directory: impl Into<PathBuf>,
    queries: Vec<QuerySpec>,
) -> SourceSpec {
    SourceSpec {
        source_type: source_type.to_string(),
        name: "test source".to_string(),
        options: serde_json::Value::Null,
        source_directory: source_directory.into(),
        queries,
    }
}

/// Records events as strings.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<String>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|x| x.clone()).unwrap_or_default()
    }

    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ExecutionEvents for RecordingEvents {
    fn source_started(&self, source: &SourceSpec) {
        self.push(format!("source started: {}", source.name));
    }

    fn query_started(&self, _source: &SourceSpec, query: &QuerySpec) {
        self.push(format!("query started: {}", query.name));
    }

    fn query_finished(&self, _source: &SourceSpec, query: &QuerySpec, _elapsed: Duration) {
        self.push(format!("query finished: {}", query.name));
    }

    fn source_finished(&self, source: &SourceSpec) {
        self.push(format!("source finished: {}", source.name));
    }

    fn output_written(&self, _source: &SourceSpec, query: &QuerySpec, _data_file: &Path) {
        self.push(format!("output written: {}", query.name));
    }
}
