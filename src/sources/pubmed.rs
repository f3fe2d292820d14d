//! PubMed source implementation using the NCBI E-utilities API.
//!
//! Searching goes through `esearch.fcgi` (count first, then paged ID
//! retrieval) and detail fetching through `efetch.fcgi` with comma-joined ID
//! batches, both with `retmode=xml`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{Author, PaperRecord, RecordBuilder};
use crate::sources::{Source, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

/// PubMed E-utilities API base URLs
const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// Records per esearch page and per efetch request
const BATCH_SIZE: usize = 100;

/// Pause between batch requests; NCBI throttles aggressive clients
const COURTESY_DELAY: Duration = Duration::from_millis(500);

/// PubMed source.
///
/// NCBI asks every client to identify itself with a contact email; an API
/// key raises the permitted request rate.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: HttpClient,
    email: String,
    api_key: Option<String>,
}

impl PubMedSource {
    /// Create a new PubMed source.
    pub fn new(email: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: HttpClient::new(),
            email: email.into(),
            api_key,
        }
    }

    /// Query parameters NCBI expects on every request
    fn common_params(&self) -> String {
        let mut params = format!(
            "&tool={}&email={}",
            env!("CARGO_PKG_NAME"),
            urlencoding::encode(&self.email)
        );
        if let Some(key) = &self.api_key {
            params.push_str("&api_key=");
            params.push_str(&urlencoding::encode(key));
        }
        params
    }

    /// Build an esearch URL for one result page
    fn search_url(&self, query: &str, retstart: usize, retmax: usize) -> String {
        format!(
            "{}?db=pubmed&term={}&retstart={}&retmax={}&retmode=xml{}",
            ESEARCH_URL,
            urlencoding::encode(query),
            retstart,
            retmax,
            self.common_params()
        )
    }

    /// Build an efetch URL for a batch of PubMed IDs
    fn fetch_url(&self, ids: &[String]) -> String {
        format!(
            "{}?db=pubmed&id={}&retmode=xml{}",
            EFETCH_URL,
            ids.join(","),
            self.common_params()
        )
    }

    /// GET a URL with retry on transient failures, returning the body text
    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let client = self.client.clone();
        let url = url.to_string();

        with_retry(api_retry_config(), move || {
            let client = client.clone();
            let url = url.clone();
            async move {
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| SourceError::Network(format!("request failed: {}", e)))?;

                let status = response.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(SourceError::RateLimit);
                }
                if status.is_server_error() {
                    return Err(SourceError::Network(format!("PubMed server error: {}", status)));
                }
                if !status.is_success() {
                    return Err(SourceError::Api(format!("PubMed returned status {}", status)));
                }

                response
                    .text()
                    .await
                    .map_err(|e| SourceError::Network(format!("failed to read response: {}", e)))
            }
        })
        .await
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SourceError> {
        // Count first, then page through the IDs
        let xml = self.get_text(&self.search_url(query, 0, 0)).await?;
        let page = parse_search_response(&xml)?;

        let total = page.count.min(max_results);
        debug!("query matched {} records, fetching {}", page.count, total);
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(total);
        let mut start = 0;
        while start < total {
            let retmax = BATCH_SIZE.min(total - start);
            debug!("downloading record {} to {}", start + 1, start + retmax);

            let xml = self.get_text(&self.search_url(query, start, retmax)).await?;
            let page = parse_search_response(&xml)?;
            if page.ids.is_empty() {
                break;
            }
            ids.extend(page.ids);

            start += BATCH_SIZE;
            if start < total {
                tokio::time::sleep(COURTESY_DELAY).await;
            }
        }

        ids.truncate(max_results);
        Ok(ids)
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<PaperRecord>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("fetching details for {} papers", ids.len());

        let batches = ids.chunks(BATCH_SIZE).count();
        let mut outcomes = Vec::with_capacity(batches);

        for (index, batch) in ids.chunks(BATCH_SIZE).enumerate() {
            debug!("fetching batch {} of {}, size {}", index + 1, batches, batch.len());

            let outcome = match self.get_text(&self.fetch_url(batch)).await {
                Ok(xml) => parse_fetch_response(&xml),
                Err(e) => Err(e),
            };
            outcomes.push(outcome);

            if index + 1 < batches {
                tokio::time::sleep(COURTESY_DELAY).await;
            }
        }

        merge_batch_results(outcomes)
    }
}

/// Combine per-batch efetch outcomes.
///
/// A malformed batch is logged and skipped, and a fetch failure is tolerated
/// as long as some other batch got through. When every batch failed to fetch
/// the whole operation failed, and the last error is returned.
fn merge_batch_results(
    outcomes: Vec<Result<Vec<PaperRecord>, SourceError>>,
) -> Result<Vec<PaperRecord>, SourceError> {
    let total = outcomes.len();
    let mut records = Vec::new();
    let mut fetch_failures = 0;
    let mut last_error = None;

    for outcome in outcomes {
        match outcome {
            Ok(batch) => records.extend(batch),
            Err(SourceError::Parse(msg)) => warn!("skipping malformed efetch batch: {}", msg),
            Err(e) => {
                warn!("failed to fetch batch: {}", e);
                fetch_failures += 1;
                last_error = Some(e);
            }
        }
    }

    if fetch_failures == total {
        if let Some(error) = last_error {
            return Err(error);
        }
    }
    Ok(records)
}

/// One page of an esearch response
#[derive(Debug)]
struct SearchPage {
    count: usize,
    ids: Vec<String>,
}

fn parse_search_response(xml: &str) -> Result<SearchPage, SourceError> {
    let result: ESearchResult = quick_xml::de::from_str(xml)
        .map_err(|e| SourceError::Parse(format!("esearch XML: {}", e)))?;

    let count = result
        .count
        .as_deref()
        .and_then(|c| c.trim().parse().ok())
        .unwrap_or(0);

    Ok(SearchPage {
        count,
        ids: result.id_list.unwrap_or_default().ids,
    })
}

fn parse_fetch_response(xml: &str) -> Result<Vec<PaperRecord>, SourceError> {
    let set: PubmedArticleSet = quick_xml::de::from_str(xml)
        .map_err(|e| SourceError::Parse(format!("efetch XML: {}", e)))?;

    let mut records = Vec::new();
    for article in set.articles {
        match article.into_record() {
            Some(record) => records.push(record),
            None => warn!("skipping article with incomplete metadata"),
        }
    }
    Ok(records)
}

// E-utilities XML response shapes. Element names follow the PubMed DTD; the
// `Text` wrapper absorbs attributes like `<PMID Version="1">`.

#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(rename = "Count")]
    count: Option<String>,
    #[serde(rename = "IdList")]
    id_list: Option<IdList>,
}

#[derive(Debug, Deserialize, Default)]
struct IdList {
    #[serde(rename = "Id", default)]
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticle {
    #[serde(rename = "MedlineCitation")]
    citation: Option<MedlineCitation>,
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Option<Text>,
    #[serde(rename = "Article")]
    article: Option<XmlArticle>,
}

#[derive(Debug, Deserialize)]
struct XmlArticle {
    #[serde(rename = "Journal")]
    journal: Option<XmlJournal>,
    #[serde(rename = "ArticleTitle")]
    title: Option<Text>,
    #[serde(rename = "AuthorList")]
    author_list: Option<XmlAuthorList>,
}

#[derive(Debug, Deserialize)]
struct XmlJournal {
    #[serde(rename = "Title")]
    title: Option<Text>,
    #[serde(rename = "JournalIssue")]
    issue: Option<XmlJournalIssue>,
}

#[derive(Debug, Deserialize)]
struct XmlJournalIssue {
    #[serde(rename = "PubDate")]
    pub_date: Option<PubDate>,
}

#[derive(Debug, Deserialize)]
struct PubDate {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Month")]
    month: Option<String>,
    #[serde(rename = "Day")]
    day: Option<String>,
    #[serde(rename = "MedlineDate")]
    medline_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlAuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<XmlAuthor>,
}

#[derive(Debug, Deserialize)]
struct XmlAuthor {
    #[serde(rename = "LastName")]
    last_name: Option<Text>,
    #[serde(rename = "ForeName")]
    fore_name: Option<Text>,
    #[serde(rename = "Initials")]
    initials: Option<Text>,
    #[serde(rename = "CollectiveName")]
    collective_name: Option<Text>,
    #[serde(rename = "AffiliationInfo", default)]
    affiliations: Vec<XmlAffiliationInfo>,
}

#[derive(Debug, Deserialize)]
struct XmlAffiliationInfo {
    #[serde(rename = "Affiliation")]
    affiliation: Option<Text>,
}

impl PubmedArticle {
    /// Convert a raw article into a normalized record. Returns None when
    /// the citation lacks a PMID or article body.
    fn into_record(self) -> Option<PaperRecord> {
        let citation = self.citation?;
        let pmid = citation.pmid?.value;
        let article = citation.article?;

        let title = article.title.map(|t| t.value).unwrap_or_default();

        let journal = article
            .journal
            .as_ref()
            .and_then(|j| j.title.as_ref())
            .map(|t| t.value.clone())
            .unwrap_or_default();

        let date = article
            .journal
            .as_ref()
            .and_then(|j| j.issue.as_ref())
            .and_then(|i| i.pub_date.as_ref())
            .map(format_pub_date)
            .unwrap_or_else(|| "Unknown".to_string());

        let mut builder = RecordBuilder::new(pmid, title)
            .publication_date(date)
            .journal(journal);

        if let Some(author_list) = article.author_list {
            for xml_author in author_list.authors {
                if let Some(author) = xml_author.into_author() {
                    builder = builder.author(author);
                }
            }
        }

        Some(builder.build())
    }
}

impl XmlAuthor {
    /// Build an [`Author`], skipping entries with neither a last name nor a
    /// collective name.
    fn into_author(self) -> Option<Author> {
        let name = if let Some(last) = &self.last_name {
            if let Some(fore) = &self.fore_name {
                format!("{} {}", fore.value, last.value)
            } else if let Some(initials) = &self.initials {
                format!("{} {}", initials.value, last.value)
            } else {
                last.value.clone()
            }
        } else {
            self.collective_name.as_ref()?.value.clone()
        };

        let affiliations: Vec<String> = self
            .affiliations
            .into_iter()
            .filter_map(|info| info.affiliation)
            .map(|t| t.value)
            .collect();

        let mut author = Author::new(name);
        if let Some(email) = extract_email(&affiliations) {
            author = author.email(email);
        }
        if !affiliations.is_empty() {
            author = author.affiliation(affiliations.join("; "));
        }
        Some(author)
    }
}

/// Normalize a PubMed publication date to YYYY-MM-DD.
///
/// PubMed dates vary: Year/Month/Day elements with month names or numbers,
/// or a free-form MedlineDate like "2022 Jan-Feb" (passed through verbatim).
fn format_pub_date(date: &PubDate) -> String {
    if let Some(year) = date.year.as_deref() {
        let Ok(year_num) = year.trim().parse::<i32>() else {
            return year.to_string();
        };
        let month = date.month.as_deref().map(month_number).unwrap_or(1);
        let day: u32 = date
            .day
            .as_deref()
            .and_then(|d| d.trim().parse().ok())
            .unwrap_or(1);

        return NaiveDate::from_ymd_opt(year_num, month, day)
            .or_else(|| NaiveDate::from_ymd_opt(year_num, month, 1))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| year.to_string());
    }

    date.medline_date
        .clone()
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Map a PubMed month value ("Jan", "January", "1", "01") to its number.
fn month_number(month: &str) -> u32 {
    let month = month.trim();
    if let Ok(n) = month.parse::<u32>() {
        return n.clamp(1, 12);
    }
    let lower = month.to_lowercase();
    match lower.get(..3) {
        Some("jan") => 1,
        Some("feb") => 2,
        Some("mar") => 3,
        Some("apr") => 4,
        Some("may") => 5,
        Some("jun") => 6,
        Some("jul") => 7,
        Some("aug") => 8,
        Some("sep") => 9,
        Some("oct") => 10,
        Some("nov") => 11,
        Some("dec") => 12,
        _ => 1,
    }
}

/// Pull the first email-looking token out of the affiliation strings.
/// PubMed has no dedicated email field; addresses ride along in the
/// affiliation text.
fn extract_email(affiliations: &[String]) -> Option<String> {
    for affiliation in affiliations {
        for token in affiliation.split_whitespace() {
            if token.contains('@') {
                let email = token.trim_matches(&['.', ',', ';', '(', ')'][..]);
                if !email.is_empty() {
                    return Some(email.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> PubMedSource {
        PubMedSource::new("test@example.com", None)
    }

    #[test]
    fn test_search_url() {
        let url = source().search_url("cancer immunotherapy", 0, 100);

        assert!(url.starts_with(ESEARCH_URL));
        assert!(url.contains("db=pubmed"));
        assert!(url.contains("term=cancer%20immunotherapy"));
        assert!(url.contains("retstart=0"));
        assert!(url.contains("retmax=100"));
        assert!(url.contains("retmode=xml"));
        assert!(url.contains("email=test%40example.com"));
        assert!(!url.contains("api_key"));
    }

    #[test]
    fn test_search_url_with_api_key() {
        let source = PubMedSource::new("test@example.com", Some("secret-key".to_string()));
        let url = source.search_url("cancer", 100, 50);

        assert!(url.contains("retstart=100"));
        assert!(url.contains("api_key=secret-key"));
    }

    #[test]
    fn test_fetch_url_joins_ids() {
        let ids = vec!["123".to_string(), "456".to_string()];
        let url = source().fetch_url(&ids);

        assert!(url.starts_with(EFETCH_URL));
        assert!(url.contains("id=123,456"));
        assert!(url.contains("retmode=xml"));
    }

    #[test]
    fn test_parse_search_response() {
        let xml = r#"<?xml version="1.0"?>
            <eSearchResult>
                <Count>231</Count>
                <RetMax>2</RetMax>
                <RetStart>0</RetStart>
                <IdList>
                    <Id>36038629</Id>
                    <Id>35932264</Id>
                </IdList>
            </eSearchResult>"#;

        let page = parse_search_response(xml).unwrap();
        assert_eq!(page.count, 231);
        assert_eq!(page.ids, vec!["36038629", "35932264"]);
    }

    #[test]
    fn test_parse_search_response_no_matches() {
        let xml = r#"<eSearchResult><Count>0</Count><IdList/></eSearchResult>"#;

        let page = parse_search_response(xml).unwrap();
        assert_eq!(page.count, 0);
        assert!(page.ids.is_empty());
    }

    #[test]
    fn test_parse_search_response_invalid() {
        assert!(parse_search_response("not xml at all <<<").is_err());
    }

    #[test]
    fn test_parse_fetch_response() {
        let xml = r#"<?xml version="1.0"?>
            <PubmedArticleSet>
              <PubmedArticle>
                <MedlineCitation Status="MEDLINE">
                  <PMID Version="1">12345</PMID>
                  <Article>
                    <Journal>
                      <Title>Nature Medicine</Title>
                      <JournalIssue>
                        <PubDate><Year>2022</Year><Month>Jan</Month><Day>15</Day></PubDate>
                      </JournalIssue>
                    </Journal>
                    <ArticleTitle>A trial of something new</ArticleTitle>
                    <AuthorList>
                      <Author>
                        <LastName>Doe</LastName>
                        <ForeName>John</ForeName>
                        <AffiliationInfo>
                          <Affiliation>Pharma Inc, Cambridge, MA. john.doe@pharma.com.</Affiliation>
                        </AffiliationInfo>
                      </Author>
                      <Author>
                        <LastName>Smith</LastName>
                        <Initials>J</Initials>
                        <AffiliationInfo>
                          <Affiliation>Harvard University, Boston, MA.</Affiliation>
                        </AffiliationInfo>
                      </Author>
                      <Author>
                        <CollectiveName>The Study Group</CollectiveName>
                      </Author>
                    </AuthorList>
                  </Article>
                </MedlineCitation>
              </PubmedArticle>
            </PubmedArticleSet>"#;

        let records = parse_fetch_response(xml).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.pubmed_id, "12345");
        assert_eq!(record.title, "A trial of something new");
        assert_eq!(record.journal, "Nature Medicine");
        assert_eq!(record.publication_date, "2022-01-15");
        assert_eq!(record.authors.len(), 3);

        assert_eq!(record.authors[0].name, "John Doe");
        assert_eq!(
            record.authors[0].affiliation,
            "Pharma Inc, Cambridge, MA. john.doe@pharma.com."
        );
        assert_eq!(record.authors[0].email.as_deref(), Some("john.doe@pharma.com"));

        assert_eq!(record.authors[1].name, "J Smith");
        assert_eq!(record.authors[1].email, None);

        assert_eq!(record.authors[2].name, "The Study Group");
        assert!(record.authors[2].affiliation.is_empty());
    }

    #[test]
    fn test_parse_fetch_response_skips_incomplete_articles() {
        // Second article has no PMID and is dropped without failing the batch
        let xml = r#"<PubmedArticleSet>
              <PubmedArticle>
                <MedlineCitation>
                  <PMID>111</PMID>
                  <Article><ArticleTitle>Kept</ArticleTitle></Article>
                </MedlineCitation>
              </PubmedArticle>
              <PubmedArticle>
                <MedlineCitation>
                  <Article><ArticleTitle>Dropped</ArticleTitle></Article>
                </MedlineCitation>
              </PubmedArticle>
            </PubmedArticleSet>"#;

        let records = parse_fetch_response(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pubmed_id, "111");
        assert_eq!(records[0].publication_date, "Unknown");
    }

    #[test]
    fn test_merge_fails_when_every_batch_fails_to_fetch() {
        let outcomes = vec![
            Err(SourceError::Network("connection reset".to_string())),
            Err(SourceError::Network("connection reset".to_string())),
        ];
        assert!(matches!(
            merge_batch_results(outcomes),
            Err(SourceError::Network(_))
        ));

        let sole = vec![Err(SourceError::Network("timed out".to_string()))];
        assert!(merge_batch_results(sole).is_err());
    }

    #[test]
    fn test_merge_tolerates_partial_fetch_failures() {
        let record = RecordBuilder::new("1", "Kept").build();
        let outcomes = vec![
            Err(SourceError::Network("connection reset".to_string())),
            Ok(vec![record]),
        ];

        let records = merge_batch_results(outcomes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pubmed_id, "1");
    }

    #[test]
    fn test_merge_skips_malformed_batches() {
        let record = RecordBuilder::new("1", "Kept").build();
        let outcomes = vec![
            Err(SourceError::Parse("bad xml".to_string())),
            Ok(vec![record]),
        ];

        let records = merge_batch_results(outcomes).unwrap();
        assert_eq!(records.len(), 1);

        // Parse failures alone never fail the operation
        let only_parse = vec![Err(SourceError::Parse("bad xml".to_string()))];
        assert!(merge_batch_results(only_parse).unwrap().is_empty());
    }

    #[test]
    fn test_format_pub_date_variants() {
        let date = PubDate {
            year: Some("2022".into()),
            month: Some("Mar".into()),
            day: Some("7".into()),
            medline_date: None,
        };
        assert_eq!(format_pub_date(&date), "2022-03-07");

        let numeric = PubDate {
            year: Some("2021".into()),
            month: Some("11".into()),
            day: None,
            medline_date: None,
        };
        assert_eq!(format_pub_date(&numeric), "2021-11-01");

        let medline = PubDate {
            year: None,
            month: None,
            day: None,
            medline_date: Some("2022 Jan-Feb".into()),
        };
        assert_eq!(format_pub_date(&medline), "2022 Jan-Feb");

        let empty = PubDate {
            year: None,
            month: None,
            day: None,
            medline_date: None,
        };
        assert_eq!(format_pub_date(&empty), "Unknown");
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Jan"), 1);
        assert_eq!(month_number("December"), 12);
        assert_eq!(month_number("09"), 9);
        assert_eq!(month_number("bogus"), 1);
    }

    #[test]
    fn test_extract_email() {
        let affiliations = vec![
            "Harvard University, Boston, MA.".to_string(),
            "Pfizer Inc, New York (contact: jane@pfizer.com).".to_string(),
        ];
        assert_eq!(extract_email(&affiliations).as_deref(), Some("jane@pfizer.com"));

        let none = vec!["Stanford University".to_string()];
        assert_eq!(extract_email(&none), None);
    }
}
