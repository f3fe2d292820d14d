//! Core data models for fetched papers and their authors.

mod paper;

pub use paper::{Author, PaperRecord, RecordBuilder};
