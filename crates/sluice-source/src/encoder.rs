use std::sync::Arc;

use bytes::Bytes;
use datafusion::arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, RecordBatch, StringBuilder,
    TimestampMillisecondBuilder,
};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use sluice_common::config::{ParquetCompression, ParquetConfig};

use crate::error::{SourceError, SourceResult};
use crate::result::{ColumnDataType, ColumnType, Row, Value};

pub const PARQUET_EXTENSION: &str = "parquet";
pub const DATE_TIMEZONE: &str = "UTC";

/// Converts a result set into a binary columnar file.
pub trait ColumnarEncoder: Send + Sync + 'static {
    /// The extension of the data file, without the leading dot.
    fn extension(&self) -> &str;

    fn encode(&self, column_types: &[ColumnType], rows: &[Row]) -> SourceResult<Bytes>;
}

#[derive(Debug, Clone, Default)]
pub struct ParquetEncoder {
    config: ParquetConfig,
}

impl ParquetEncoder {
    pub fn new(config: ParquetConfig) -> Self {
        Self { config }
    }

    fn writer_properties(&self) -> WriterProperties {
        let compression = match self.config.compression {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
        };
        WriterProperties::builder()
            .set_compression(compression)
            .set_max_row_group_size(self.config.max_row_group_size.max(1))
            .build()
    }
}

impl ColumnarEncoder for ParquetEncoder {
    fn extension(&self) -> &str {
        PARQUET_EXTENSION
    }

    fn encode(&self, column_types: &[ColumnType], rows: &[Row]) -> SourceResult<Bytes> {
        let batch = build_record_batch(column_types, rows)?;
        let mut writer =
            ArrowWriter::try_new(Vec::new(), batch.schema(), Some(self.writer_properties()))?;
        writer.write(&batch)?;
        let buffer = writer.into_inner()?;
        Ok(Bytes::from(buffer))
    }
}

pub fn arrow_data_type(data_type: ColumnDataType) -> DataType {
    match data_type {
        ColumnDataType::Boolean => DataType::Boolean,
        ColumnDataType::Number => DataType::Float64,
        ColumnDataType::String => DataType::Utf8,
        ColumnDataType::Date => {
            DataType::Timestamp(TimeUnit::Millisecond, Some(DATE_TIMEZONE.into()))
        }
    }
}

pub fn arrow_schema(column_types: &[ColumnType]) -> SchemaRef {
    let fields = column_types
        .iter()
        .map(|c| Field::new(&c.name, arrow_data_type(c.data_type), true))
        .collect::<Vec<_>>();
    Arc::new(Schema::new(fields))
}

/// Builds a single record batch holding all the rows.
pub fn build_record_batch(column_types: &[ColumnType], rows: &[Row]) -> SourceResult<RecordBatch> {
    if column_types.is_empty() {
        return Err(SourceError::encoding("result set has no columns"));
    }
    if let Some((index, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != column_types.len())
    {
        return Err(SourceError::encoding(format!(
            "row {index} has {} values but the result set has {} columns",
            row.len(),
            column_types.len()
        )));
    }
    let columns = column_types
        .iter()
        .enumerate()
        .map(|(i, c)| build_column(c, rows.iter().map(|row| &row[i])))
        .collect::<SourceResult<Vec<_>>>()?;
    Ok(RecordBatch::try_new(arrow_schema(column_types), columns)?)
}

fn build_column<'a>(
    column: &ColumnType,
    values: impl ExactSizeIterator<Item = &'a Value>,
) -> SourceResult<ArrayRef> {
    let mismatch = |value: &Value| {
        SourceError::encoding(format!(
            "column {} of type {:?} cannot hold value {value:?}",
            column.name, column.data_type
        ))
    };
    let array: ArrayRef = match column.data_type {
        ColumnDataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Boolean(x) => builder.append_value(*x),
                    _ => return Err(mismatch(value)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnDataType::Number => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Number(x) => builder.append_value(*x),
                    _ => return Err(mismatch(value)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnDataType::String => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::String(x) => builder.append_value(x),
                    _ => return Err(mismatch(value)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnDataType::Date => {
            let mut builder = TimestampMillisecondBuilder::with_capacity(values.len())
                .with_timezone(DATE_TIMEZONE);
            for value in values {
                match value {
                    Value::Null => builder.append_null(),
                    Value::Date(x) => builder.append_value(x.timestamp_millis()),
                    _ => return Err(mismatch(value)),
                }
            }
            Arc::new(builder.finish())
        }
    };
    Ok(array)
}
