//! Paper and author models shared across the fetch/filter/export pipeline.

use serde::{Deserialize, Serialize};

/// One author of a fetched paper.
///
/// `is_company_affiliated` and `company_name` are derived fields, filled in by
/// the affiliation classifier after the record is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    /// Display name ("Fore Last" or a collective name)
    pub name: String,

    /// Raw affiliation text from the source record (may be empty)
    pub affiliation: String,

    /// Email scraped from the affiliation text, when present
    pub email: Option<String>,

    /// Whether the affiliation was classified as a pharma/biotech company
    pub is_company_affiliated: bool,

    /// Company name extracted from the affiliation, when classified as company
    pub company_name: Option<String>,
}

impl Author {
    /// Create an author with no affiliation data.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: String::new(),
            email: None,
            is_company_affiliated: false,
            company_name: None,
        }
    }

    /// Set the raw affiliation text.
    pub fn affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = affiliation.into();
        self
    }

    /// Set the email address.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Normalized representation of one fetched publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// PubMed identifier (PMID)
    pub pubmed_id: String,

    /// Paper title
    pub title: String,

    /// Publication date, normalized to YYYY-MM-DD where the source provides
    /// one; otherwise the raw MedlineDate string or "Unknown"
    pub publication_date: String,

    /// Journal title
    pub journal: String,

    /// Authors in source order
    pub authors: Vec<Author>,
}

impl PaperRecord {
    /// True if at least one author is classified as company-affiliated.
    pub fn has_company_author(&self) -> bool {
        self.authors.iter().any(|a| a.is_company_affiliated)
    }

    /// Names of all company-affiliated authors, in source order.
    pub fn company_author_names(&self) -> Vec<&str> {
        self.authors
            .iter()
            .filter(|a| a.is_company_affiliated)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Distinct company names across authors, in first-seen order.
    pub fn company_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for author in &self.authors {
            if let Some(name) = author.company_name.as_deref() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Email of the first author that carries one.
    pub fn corresponding_email(&self) -> Option<&str> {
        self.authors.iter().find_map(|a| a.email.as_deref())
    }
}

/// Builder for constructing [`PaperRecord`] objects.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: PaperRecord,
}

impl RecordBuilder {
    /// Create a new builder with the required identifier and title.
    pub fn new(pubmed_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            record: PaperRecord {
                pubmed_id: pubmed_id.into(),
                title: title.into(),
                publication_date: "Unknown".to_string(),
                journal: String::new(),
                authors: Vec::new(),
            },
        }
    }

    /// Set the publication date.
    pub fn publication_date(mut self, date: impl Into<String>) -> Self {
        self.record.publication_date = date.into();
        self
    }

    /// Set the journal title.
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.record.journal = journal.into();
        self
    }

    /// Append an author, preserving source order.
    pub fn author(mut self, author: Author) -> Self {
        self.record.authors.push(author);
        self
    }

    /// Build the record.
    pub fn build(self) -> PaperRecord {
        self.record
    }
}
