use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnDataType {
    Boolean,
    Number,
    String,
    Date,
}

/// Whether the column type is reported by the engine
/// or guessed while converting the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFidelity {
    Precise,
    Inferred,
}

/// The type of one result column. The serialized form is the schema sidecar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub name: String,
    #[serde(rename = "evidenceType")]
    pub data_type: ColumnDataType,
    #[serde(rename = "typeFidelity")]
    pub fidelity: TypeFidelity,
}

impl ColumnType {
    pub fn new(name: impl Into<String>, data_type: ColumnDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            fidelity: TypeFidelity::Precise,
        }
    }

    pub fn inferred(name: impl Into<String>, data_type: ColumnDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            fidelity: TypeFidelity::Inferred,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
}

/// A row is positionally aligned with the column types of its result set.
pub type Row = Vec<Value>;

/// The output of a query that produced data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub column_types: Vec<ColumnType>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(column_types: Vec<ColumnType>, rows: Vec<Row>) -> Self {
        Self { column_types, rows }
    }

    pub fn num_columns(&self) -> usize {
        self.column_types.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}
