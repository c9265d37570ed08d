use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use parquet::errors::ParquetError;
use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unsupported database type: {0}")]
    UnsupportedSourceType(String),
    #[error("failed to create runner: {0}")]
    RunnerInstantiation(String),
    #[error("query execution failed: {0}")]
    QueryExecution(String),
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    DataFusion(#[from] DataFusionError),
}

impl SourceError {
    pub fn instantiation(message: impl Into<String>) -> Self {
        SourceError::RunnerInstantiation(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        SourceError::QueryExecution(message.into())
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        SourceError::Encoding(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        SourceError::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SourceError::InternalError(message.into())
    }
}

impl From<ArrowError> for SourceError {
    fn from(error: ArrowError) -> Self {
        SourceError::Encoding(error.to_string())
    }
}

impl From<ParquetError> for SourceError {
    fn from(error: ParquetError) -> Self {
        SourceError::Encoding(error.to_string())
    }
}
