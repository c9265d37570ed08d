pub mod discovery;
pub mod encoder;
pub mod error;
pub mod events;
pub mod executor;
pub mod output;
pub mod registry;
pub mod result;
pub mod runner;
pub mod runners;
pub mod spec;

pub use executor::{execute_source, SourceExecutor};
