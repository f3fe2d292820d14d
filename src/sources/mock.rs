//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::{Author, PaperRecord, RecordBuilder};
use crate::sources::{Source, SourceError};

/// A mock source for testing that returns predefined records.
#[derive(Debug, Default)]
pub struct MockSource {
    records: Mutex<Vec<PaperRecord>>,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Set the records to return.
    pub fn set_records(&self, records: Vec<PaperRecord>) {
        let mut guard = self.records.lock().unwrap();
        *guard = records;
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<String>, SourceError> {
        let guard = self.records.lock().unwrap();
        Ok(guard
            .iter()
            .take(max_results)
            .map(|r| r.pubmed_id.clone())
            .collect())
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<PaperRecord>, SourceError> {
        let guard = self.records.lock().unwrap();
        Ok(guard
            .iter()
            .filter(|r| ids.contains(&r.pubmed_id))
            .cloned()
            .collect())
    }
}

/// Helper function to create a mock record for testing.
pub fn make_record(pubmed_id: &str, title: &str, affiliations: &[&str]) -> PaperRecord {
    let mut builder = RecordBuilder::new(pubmed_id, title)
        .publication_date("2024-01-01")
        .journal("Test Journal");
    for (index, affiliation) in affiliations.iter().enumerate() {
        builder = builder.author(
            Author::new(format!("Author {}", index + 1)).affiliation(affiliation.to_string()),
        );
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_search_respects_max_results() {
        let source = MockSource::new();
        source.set_records(vec![
            make_record("1", "First", &[]),
            make_record("2", "Second", &[]),
            make_record("3", "Third", &[]),
        ]);

        let ids = source.search("anything", 2).await.unwrap();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_mock_fetch_matches_requested_ids() {
        let source = MockSource::new();
        source.set_records(vec![
            make_record("1", "First", &[]),
            make_record("2", "Second", &[]),
        ]);

        let records = source
            .fetch_details(&["2".to_string()])
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Second");
    }
}
