use std::path::Path;
use std::sync::Arc;

use fastrace::collector::SpanContext;
use fastrace::future::FutureExt;
use fastrace::Span;
use log::info;
use sluice_common::config::AppConfig;
use sluice_source::discovery::discover_sources;
use sluice_source::encoder::ParquetEncoder;
use sluice_source::error::{SourceError, SourceResult};
use sluice_source::registry::RunnerRegistry;
use sluice_source::spec::SourceSpec;
use sluice_source::SourceExecutor;
use sluice_telemetry::common::SpanAttribute;

pub async fn build(
    config: &AppConfig,
    sources_dir: &Path,
    output_dir: &Path,
    only: &[String],
) -> SourceResult<()> {
    let sources = select_sources(discover_sources(sources_dir)?, only)?;
    let registry = RunnerRegistry::new();
    let executor = SourceExecutor::new()
        .with_encoder(Arc::new(ParquetEncoder::new(config.parquet.clone())));

    let mut count = 0;
    for source in &sources {
        let span = Span::root("execute_source", SpanContext::random())
            .with_property(|| (SpanAttribute::SOURCE_NAME, source.name.clone()));
        let outputs = executor
            .execute(source, &registry, output_dir)
            .in_span(span)
            .await?;
        for path in &outputs {
            info!("{}: {path}", source.name);
        }
        count += outputs.len();
    }
    info!(
        "wrote {count} output(s) for {} source(s) to {}",
        sources.len(),
        output_dir.display()
    );
    Ok(())
}

pub fn list(sources_dir: &Path) -> SourceResult<()> {
    let registry = RunnerRegistry::new();
    for source in discover_sources(sources_dir)? {
        let status = if registry.contains(&source.source_type) {
            ""
        } else {
            " (unsupported)"
        };
        println!(
            "{}\t{}{status}\t{} quer{}",
            source.name,
            source.source_type,
            source.queries.len(),
            if source.queries.len() == 1 { "y" } else { "ies" }
        );
    }
    Ok(())
}

fn select_sources(sources: Vec<SourceSpec>, only: &[String]) -> SourceResult<Vec<SourceSpec>> {
    if only.is_empty() {
        return Ok(sources);
    }
    if let Some(missing) = only
        .iter()
        .find(|name| !sources.iter().any(|s| &s.name == *name))
    {
        return Err(SourceError::invalid(format!("source not found: {missing}")));
    }
    Ok(sources
        .into_iter()
        .filter(|s| only.contains(&s.name))
        .collect())
}
