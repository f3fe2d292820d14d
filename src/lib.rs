//! # get-papers-list
//!
//! Fetch research papers from PubMed and identify the ones with at least one
//! author affiliated with a pharmaceutical or biotech company.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (PaperRecord, Author)
//! - [`sources`]: PubMed E-utilities client behind a trait-based source interface
//! - [`classify`]: Keyword heuristics for academic vs. company affiliations
//! - [`export`]: Filtering and CSV/console output
//! - [`utils`]: HTTP client, retry, and email validation

pub mod classify;
pub mod export;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Author, PaperRecord};
pub use sources::{PubMedSource, Source};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
