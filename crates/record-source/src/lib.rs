//! Sample record sources for topic-feeder.
//!
//! A [`RecordSource`] turns a free-text query into a finite list of JSON
//! documents, each serialized as one UTF-8 string:
//!
//! - [`ApiSource`] queries an HTTP search API
//! - [`SyntheticSource`] generates deterministic documents from a seed

mod api;
mod error;
mod synthetic;

pub use api::{ApiSource, DEFAULT_API_URL};
pub use error::SourceError;
pub use synthetic::SyntheticSource;

/// Supplies raw input documents for one run.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Short description used in logs.
    fn describe(&self) -> String;

    /// Fetch the documents matching `query`.
    async fn fetch(&self, query: &str) -> Result<Vec<String>, SourceError>;
}
