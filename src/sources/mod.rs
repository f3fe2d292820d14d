//! Bibliographic sources behind a narrow search/fetch interface.
//!
//! The [`Source`] trait is the seam between the network and everything
//! downstream: the classifier and filter/export logic only ever see
//! [`PaperRecord`]s, so they can be tested against a [`MockSource`] with
//! fixture data and no network access.

pub mod mock;
mod pubmed;

pub use mock::MockSource;
pub use pubmed::PubMedSource;

use crate::models::PaperRecord;
use async_trait::async_trait;

/// Interface to a remote bibliographic API.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "pubmed")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Search for papers matching the query.
    ///
    /// Returns at most `max_results` IDs; an empty list when nothing matches
    /// (not an error).
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<String>, SourceError>;

    /// Fetch full records for the given IDs.
    ///
    /// Individual malformed records are skipped with a logged warning rather
    /// than failing the whole batch; the operation fails only when nothing
    /// could be fetched at all.
    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<PaperRecord>, SourceError>;
}

/// Errors that can occur when talking to a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),
}
