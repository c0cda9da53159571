pub mod analyzers;
pub mod classify;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod report;

pub use error::{ConfigurationError, DataLoadError, Error, ExportError, Result};
