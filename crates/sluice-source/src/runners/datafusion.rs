use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use datafusion::arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{
    DataType, Field, Float64Type, TimeUnit, TimestampMillisecondType,
};
use datafusion::arrow::util::display::{ArrayFormatter, FormatOptions};
use datafusion::common::TableReference;
use datafusion::prelude::{
    CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionConfig, SessionContext,
};
use log::debug;
use serde::Deserialize;

use crate::encoder::DATE_TIMEZONE;
use crate::error::{SourceError, SourceResult};
use crate::result::{ColumnDataType, ColumnType, ResultSet, Row, Value};
use crate::runner::{QueryRunner, RunnerFactory};

pub const DATAFUSION_SOURCE_TYPE: &str = "datafusion";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataFusionRunnerOptions {
    pub batch_size: Option<usize>,
}

impl DataFusionRunnerOptions {
    pub fn from_value(value: &serde_json::Value) -> SourceResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone()).map_err(|e| {
            SourceError::instantiation(format!("invalid {DATAFUSION_SOURCE_TYPE} options: {e}"))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFileKind {
    Csv,
    Parquet,
    Json,
}

impl DataFileKind {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "parquet" => Some(Self::Parquet),
            "json" | "ndjson" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Creates runners backed by an in-process DataFusion session.
///
/// Every CSV, Parquet, and newline-delimited JSON file directly inside the source
/// directory is registered as a table named after the lower-cased file stem.
pub struct DataFusionRunnerFactory;

#[async_trait]
impl RunnerFactory for DataFusionRunnerFactory {
    fn source_type(&self) -> &str {
        DATAFUSION_SOURCE_TYPE
    }

    async fn create(
        &self,
        options: &serde_json::Value,
        source_directory: &Path,
    ) -> SourceResult<Arc<dyn QueryRunner>> {
        let options = DataFusionRunnerOptions::from_value(options)?;
        let mut config = SessionConfig::new();
        if let Some(batch_size) = options.batch_size {
            config = config.with_batch_size(batch_size);
        }
        let ctx = SessionContext::new_with_config(config);
        for path in list_data_files(source_directory).await? {
            register_data_file(&ctx, &path).await?;
        }
        Ok(Arc::new(DataFusionRunner { ctx }))
    }
}

async fn list_data_files(directory: &Path) -> SourceResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut files = vec![];
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && DataFileKind::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn register_data_file(ctx: &SessionContext, path: &Path) -> SourceResult<()> {
    let (Some(kind), Some(stem), Some(extension), Some(location)) = (
        DataFileKind::from_path(path),
        path.file_stem().and_then(|x| x.to_str()),
        path.extension().and_then(|x| x.to_str()),
        path.to_str(),
    ) else {
        return Err(SourceError::instantiation(format!(
            "unsupported data file: {}",
            path.display()
        )));
    };
    let table = TableReference::bare(stem.to_lowercase());
    let extension = format!(".{extension}");
    debug!("registering {} as table {table}", path.display());
    match kind {
        DataFileKind::Csv => {
            let options = CsvReadOptions::new().file_extension(&extension);
            ctx.register_csv(table, location, options).await?
        }
        DataFileKind::Parquet => {
            let options = ParquetReadOptions {
                file_extension: &extension,
                ..Default::default()
            };
            ctx.register_parquet(table, location, options).await?
        }
        DataFileKind::Json => {
            let options = NdJsonReadOptions::default().file_extension(&extension);
            ctx.register_json(table, location, options).await?
        }
    };
    Ok(())
}

pub struct DataFusionRunner {
    ctx: SessionContext,
}

impl DataFusionRunner {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl QueryRunner for DataFusionRunner {
    async fn run(&self, content: &str, _filepath: &Path) -> SourceResult<Option<ResultSet>> {
        let df = self.ctx.sql(content).await?;
        if df.schema().fields().is_empty() {
            df.collect().await?;
            return Ok(None);
        }
        let column_types = df
            .schema()
            .fields()
            .iter()
            .map(|f| column_type(f))
            .collect::<Vec<_>>();
        let batches = df.collect().await?;
        let rows = batches_to_rows(&column_types, &batches)?;
        Ok(Some(ResultSet::new(column_types, rows)))
    }
}

fn column_type(field: &Field) -> ColumnType {
    match field.data_type() {
        DataType::Boolean => ColumnType::new(field.name(), ColumnDataType::Boolean),
        x if x.is_numeric() => ColumnType::new(field.name(), ColumnDataType::Number),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            ColumnType::new(field.name(), ColumnDataType::Date)
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            ColumnType::new(field.name(), ColumnDataType::String)
        }
        _ => ColumnType::inferred(field.name(), ColumnDataType::String),
    }
}

fn batches_to_rows(column_types: &[ColumnType], batches: &[RecordBatch]) -> SourceResult<Vec<Row>> {
    let mut rows = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());
    for batch in batches {
        let mut columns = batch
            .columns()
            .iter()
            .zip(column_types)
            .map(|(array, column)| column_values(array, column.data_type).map(Vec::into_iter))
            .collect::<SourceResult<Vec<_>>>()?;
        for _ in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter_mut()
                    .map(|c| c.next().unwrap_or(Value::Null))
                    .collect(),
            );
        }
    }
    Ok(rows)
}

fn column_values(array: &ArrayRef, data_type: ColumnDataType) -> SourceResult<Vec<Value>> {
    let conversion = |e: datafusion::arrow::error::ArrowError| {
        SourceError::execution(format!("failed to convert query result: {e}"))
    };
    let values = match data_type {
        ColumnDataType::Boolean => {
            let array = array.as_boolean();
            array
                .iter()
                .map(|x| x.map_or(Value::Null, Value::Boolean))
                .collect()
        }
        ColumnDataType::Number => {
            let array = cast(array, &DataType::Float64).map_err(conversion)?;
            array
                .as_primitive::<Float64Type>()
                .iter()
                .map(|x| x.map_or(Value::Null, Value::Number))
                .collect()
        }
        ColumnDataType::Date => {
            let target = DataType::Timestamp(TimeUnit::Millisecond, Some(DATE_TIMEZONE.into()));
            let array = cast(array, &target).map_err(conversion)?;
            array
                .as_primitive::<TimestampMillisecondType>()
                .iter()
                .map(|x| match x {
                    None => Ok(Value::Null),
                    Some(x) => DateTime::<Utc>::from_timestamp_millis(x)
                        .map(Value::Date)
                        .ok_or_else(|| SourceError::execution(format!("timestamp out of range: {x}"))),
                })
                .collect::<SourceResult<Vec<_>>>()?
        }
        ColumnDataType::String => {
            let formatter =
                ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default()).map_err(conversion)?;
            (0..array.len())
                .map(|i| {
                    if array.is_null(i) {
                        Value::Null
                    } else {
                        Value::String(formatter.value(i).to_string())
                    }
                })
                .collect()
        }
    };
    Ok(values)
}
