use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SourceError, SourceResult};
use crate::runner::RunnerFactory;
use crate::runners::datafusion::DataFusionRunnerFactory;
use crate::runners::inline::InlineRunnerFactory;

/// Maps source types to runner factories.
#[derive(Default)]
pub struct RunnerRegistry {
    factories: HashMap<String, Arc<dyn RunnerFactory>>,
}

impl RunnerRegistry {
    /// Creates a registry with the built-in runners.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(Arc::new(DataFusionRunnerFactory));
        registry.register(Arc::new(InlineRunnerFactory));

        registry
    }

    /// Creates a registry without any runner.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registers a factory, replacing any factory with the same source type.
    pub fn register(&mut self, factory: Arc<dyn RunnerFactory>) {
        self.factories
            .insert(factory.source_type().to_string(), factory);
    }

    pub fn contains(&self, source_type: &str) -> bool {
        self.factories.contains_key(source_type)
    }

    pub fn get(&self, source_type: &str) -> SourceResult<Arc<dyn RunnerFactory>> {
        self.factories
            .get(source_type)
            .cloned()
            .ok_or_else(|| SourceError::UnsupportedSourceType(source_type.to_string()))
    }

    /// Returns the registered source types in sorted order.
    pub fn source_types(&self) -> Vec<&str> {
        let mut types = self.factories.keys().map(|x| x.as_str()).collect::<Vec<_>>();
        types.sort_unstable();
        types
    }
}
