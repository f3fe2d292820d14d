//! Filtering and output of fetched paper records.
//!
//! Records pass through the affiliation classifier, papers without a single
//! company-affiliated author are dropped, and the survivors go to a CSV file
//! or the console.

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::classify::annotate_author;
use crate::models::PaperRecord;

/// CSV header row, written even when no paper qualifies
pub const CSV_HEADERS: &[&str] = &[
    "PubmedID",
    "Title",
    "Publication Date",
    "Journal",
    "Author(s)",
    "Non-academic Author(s)",
    "Company Affiliation(s)",
    "Corresponding Author Email",
];

/// Errors that can occur while exporting results
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Classify every author's affiliation and keep only the papers with at
/// least one company-affiliated author. Input order is preserved.
pub fn filter_company_papers(mut records: Vec<PaperRecord>) -> Vec<PaperRecord> {
    for record in &mut records {
        for author in &mut record.authors {
            annotate_author(author);
        }
    }
    let total = records.len();
    records.retain(PaperRecord::has_company_author);
    info!(
        "{} of {} papers have at least one company-affiliated author",
        records.len(),
        total
    );
    records
}

/// One output row. List-valued fields are joined with "; ".
#[derive(Debug, Serialize)]
struct CsvRow {
    pubmed_id: String,
    title: String,
    publication_date: String,
    journal: String,
    authors: String,
    company_authors: String,
    companies: String,
    email: String,
}

impl CsvRow {
    fn from_record(record: &PaperRecord) -> Self {
        Self {
            pubmed_id: record.pubmed_id.clone(),
            title: record.title.clone(),
            publication_date: record.publication_date.clone(),
            journal: record.journal.clone(),
            authors: record
                .authors
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            company_authors: record.company_author_names().join("; "),
            companies: record.company_names().join("; "),
            email: record.corresponding_email().unwrap_or_default().to_string(),
        }
    }
}

/// Write the filtered records to a CSV file at `path`.
///
/// The header row is always written, so an empty result set produces a valid
/// single-line CSV rather than an empty file.
pub fn export_to_csv(records: &[PaperRecord], path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(CSV_HEADERS)?;
    for record in records {
        writer.serialize(CsvRow::from_record(record))?;
    }
    writer.flush()?;

    info!("wrote {} papers to {}", records.len(), path.display());
    Ok(())
}

/// Print the filtered records to the given writer in a readable block format.
pub fn print_results(records: &[PaperRecord], out: &mut impl Write) -> Result<(), ExportError> {
    if records.is_empty() {
        writeln!(out, "No papers with company-affiliated authors found.")?;
        return Ok(());
    }

    writeln!(out, "Found {} paper(s) with company-affiliated authors:", records.len())?;
    for record in records {
        writeln!(out)?;
        writeln!(out, "PubmedID: {}", record.pubmed_id)?;
        writeln!(out, "Title: {}", record.title)?;
        writeln!(out, "Publication Date: {}", record.publication_date)?;
        if !record.journal.is_empty() {
            writeln!(out, "Journal: {}", record.journal)?;
        }
        writeln!(
            out,
            "Non-academic Author(s): {}",
            record.company_author_names().join("; ")
        )?;
        writeln!(
            out,
            "Company Affiliation(s): {}",
            record.company_names().join("; ")
        )?;
        if let Some(email) = record.corresponding_email() {
            writeln!(out, "Corresponding Author Email: {}", email)?;
        }
    }
    Ok(())
}
