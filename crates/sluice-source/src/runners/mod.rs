pub mod datafusion;
pub mod inline;
