//! Affiliation classification heuristics.
//!
//! Decides whether a free-text affiliation string points at a
//! pharmaceutical/biotech company rather than an academic institution. The
//! whole thing is two immutable keyword slices plus a pure decision function;
//! matching is case-insensitive substring search with no unicode
//! normalization.

use crate::models::Author;

/// Keywords marking an affiliation as academic. Checked first: many pharma
/// affiliations also mention an institute or hospital, and academic
/// indicators win that tie.
const ACADEMIC_KEYWORDS: &[&str] = &[
    "university",
    "college",
    "institute",
    "school",
    "faculty",
    "academy",
    "hospital",
    "clinic",
    "medical center",
    "medical centre",
    "national",
    "federal",
    "ministry",
    "government",
    "research center",
    "foundation",
];

/// Keywords indicating a pharmaceutical or biotech company.
const COMPANY_KEYWORDS: &[&str] = &[
    "pharm",
    "biotech",
    "biopharma",
    "therapeutics",
    "biosciences",
    "biologics",
    "life sciences",
    "diagnostics",
    "genomics",
    "medicines",
    "drug",
    "inc",
    "corp",
    "llc",
    "ltd",
    "gmbh",
    "co.",
    "company",
    "laboratories",
    "labs",
    "technologies",
];

/// Verdict for a single affiliation string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    /// Affiliation looks like a pharma/biotech company
    pub is_company: bool,

    /// Affiliation matched an academic indicator
    pub is_academic: bool,

    /// Best-effort company name, when classified as company
    pub company_name: Option<String>,
}

/// Classify one affiliation string.
///
/// Empty or whitespace-only input is non-company, non-academic.
pub fn classify_affiliation(affiliation: &str) -> Classification {
    if affiliation.trim().is_empty() {
        return Classification::default();
    }

    let lower = affiliation.to_lowercase();

    if ACADEMIC_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Classification {
            is_academic: true,
            ..Classification::default()
        };
    }

    if COMPANY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Classification {
            is_company: true,
            is_academic: false,
            company_name: extract_company_name(affiliation),
        };
    }

    Classification::default()
}

/// Capture everything up to the first comma as the company name.
/// Best-effort; returns None when nothing useful precedes the comma.
fn extract_company_name(affiliation: &str) -> Option<String> {
    let name = affiliation.split(',').next().unwrap_or("").trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Annotate an author in place with the classifier's verdict on its
/// affiliation text.
pub fn annotate_author(author: &mut Author) {
    let verdict = classify_affiliation(&author.affiliation);
    author.is_company_affiliated = verdict.is_company;
    author.company_name = verdict.company_name;
}
