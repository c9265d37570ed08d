use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{SourceError, SourceResult};
use crate::result::{ColumnDataType, ColumnType, ResultSet, Row, Value};
use crate::runner::{QueryRunner, RunnerFactory};

pub const INLINE_SOURCE_TYPE: &str = "inline";

/// Serves result sets embedded in the query content as JSON, e.g.
///
/// ```json
/// {"columnTypes": [{"name": "n", "evidenceType": "number", "typeFidelity": "precise"}], "rows": [[1], [2]]}
/// ```
///
/// Blank content or `null` produces no output.
pub struct InlineRunnerFactory;

#[async_trait]
impl RunnerFactory for InlineRunnerFactory {
    fn source_type(&self) -> &str {
        INLINE_SOURCE_TYPE
    }

    async fn create(
        &self,
        _options: &serde_json::Value,
        _source_directory: &Path,
    ) -> SourceResult<Arc<dyn QueryRunner>> {
        Ok(Arc::new(InlineRunner))
    }
}

pub struct InlineRunner;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct InlineResult {
    column_types: Vec<ColumnType>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

#[async_trait]
impl QueryRunner for InlineRunner {
    async fn run(&self, content: &str, filepath: &Path) -> SourceResult<Option<ResultSet>> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        let parsed: Option<InlineResult> = serde_json::from_str(content).map_err(|e| {
            SourceError::execution(format!("{}: invalid inline result: {e}", filepath.display()))
        })?;
        let Some(InlineResult { column_types, rows }) = parsed else {
            return Ok(None);
        };
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| convert_row(&column_types, index, row))
            .collect::<SourceResult<Vec<_>>>()?;
        Ok(Some(ResultSet::new(column_types, rows)))
    }
}

fn convert_row(
    column_types: &[ColumnType],
    index: usize,
    row: Vec<serde_json::Value>,
) -> SourceResult<Row> {
    if row.len() != column_types.len() {
        return Err(SourceError::execution(format!(
            "row {index} has {} values but there are {} columns",
            row.len(),
            column_types.len()
        )));
    }
    column_types
        .iter()
        .zip(row)
        .map(|(column, value)| {
            convert_value(column.data_type, value).ok_or_else(|| {
                SourceError::execution(format!(
                    "row {index}: invalid value for column {}",
                    column.name
                ))
            })
        })
        .collect()
}

fn convert_value(data_type: ColumnDataType, value: serde_json::Value) -> Option<Value> {
    use serde_json::Value as Json;

    match (data_type, value) {
        (_, Json::Null) => Some(Value::Null),
        (ColumnDataType::Boolean, Json::Bool(x)) => Some(Value::Boolean(x)),
        (ColumnDataType::Number, Json::Number(x)) => x.as_f64().map(Value::Number),
        (ColumnDataType::String, Json::String(x)) => Some(Value::String(x)),
        (ColumnDataType::Date, Json::String(x)) => DateTime::parse_from_rfc3339(&x)
            .ok()
            .map(|x| Value::Date(x.with_timezone(&Utc))),
        (ColumnDataType::Date, Json::Number(x)) => x
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(Value::Date),
        _ => None,
    }
}
