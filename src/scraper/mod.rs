//! Precedent scraper - collects case law from Indian Kanoon
//!
//! Walks paginated search results for an IPC section, visits each case
//! page, and extracts `{case_name, citation, link, summary_text}` rows
//! into a CSV the precedent loader can ingest. A fixed delay between
//! requests keeps the crawl polite.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use serde::Serialize;

/// Maximum stored summary length in characters.
const MAX_SUMMARY_CHARS: usize = 2000;

/// Characters taken from the judgment body when no headnote blocks exist.
const JUDGMENT_FALLBACK_CHARS: usize = 1500;

/// A scraped case row, CSV-compatible with the precedent loader.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedCase {
    pub case_name: String,
    pub citation: String,
    pub link: String,
    pub summary_text: String,
}

/// Scraper settings.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Search base URL.
    pub base_url: String,
    /// Number of search result pages to walk.
    pub pages: usize,
    /// Cap on the number of cases scraped.
    pub max_cases: usize,
    /// Pause between requests.
    pub delay: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://indiankanoon.org".to_string(),
            pages: 3,
            max_cases: 20,
            delay: Duration::from_secs(2),
        }
    }
}

/// Case-law scraper.
pub struct CaseScraper {
    client: reqwest::Client,
    config: ScraperConfig,
}

impl CaseScraper {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("lexverdict/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Scrape cases for one IPC section.
    pub async fn scrape_section(&self, section: &str) -> Result<Vec<ScrapedCase>> {
        let links = self.collect_case_links(section).await?;
        if links.is_empty() {
            tracing::warn!("No case links found for IPC {}", section);
            return Ok(vec![]);
        }

        tracing::info!(
            "Scraping details for {} cases (IPC {})",
            links.len(),
            section
        );

        let mut cases = Vec::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            tracing::info!("Processing case {}/{}: {}", i + 1, links.len(), link);

            match self.fetch(link).await {
                Ok(html) => cases.push(parse_case_page(&html, link)),
                Err(e) => tracing::warn!("Failed to fetch {}: {}", link, e),
            }

            tokio::time::sleep(self.config.delay).await;
        }

        Ok(cases)
    }

    /// Walk the paginated search results and collect unique case links.
    async fn collect_case_links(&self, section: &str) -> Result<Vec<String>> {
        let mut links = Vec::new();
        let mut seen = HashSet::new();

        for page in 0..self.config.pages {
            let url = format!(
                "{}/search/?formInput=IPC+{}&pagenum={}",
                self.config.base_url, section, page
            );
            tracing::info!("Scraping search page {}: {}", page + 1, url);

            let html = match self.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("Search page {} failed: {}", page + 1, e);
                    break;
                }
            };

            let page_links = extract_case_links(&html);
            if page_links.is_empty() {
                tracing::info!("No results on page {}, stopping pagination", page + 1);
                break;
            }

            for href in page_links {
                let full = format!("{}{}", self.config.base_url, href);
                if seen.insert(full.clone()) {
                    links.push(full);
                }
                if links.len() >= self.config.max_cases {
                    return Ok(links);
                }
            }

            tokio::time::sleep(self.config.delay).await;
        }

        Ok(links)
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;

        response.text().await.context("Failed to read response body")
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Extract `/doc/...` links from the search results area.
fn extract_case_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("div.result a") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if href.starts_with("/doc/") {
                    links.push(href.to_string());
                }
            }
        }
    }

    links
}

/// Parse a case page into a row.
fn parse_case_page(html: &str, link: &str) -> ScrapedCase {
    let document = Html::parse_document(html);

    ScrapedCase {
        case_name: extract_case_name(&document),
        citation: extract_citation(&document),
        link: link.to_string(),
        summary_text: extract_summary(&document),
    }
}

/// Case name from the page title, dropping the site-name suffix.
fn extract_case_name(document: &Html) -> String {
    if let Ok(selector) = Selector::parse("title") {
        if let Some(element) = document.select(&selector).next() {
            let title = element.text().collect::<String>();
            let name = title.split('|').next().unwrap_or("").trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    "N/A".to_string()
}

/// Citation from the doc-source block.
fn extract_citation(document: &Html) -> String {
    if let Ok(selector) = Selector::parse("div.docsource_main") {
        if let Some(element) = document.select(&selector).next() {
            let citation = element.text().collect::<String>().trim().to_string();
            if !citation.is_empty() {
                return citation;
            }
        }
    }

    "N/A".to_string()
}

/// Summary from the first headnote `<pre>` blocks, falling back to the
/// start of the judgment body.
fn extract_summary(document: &Html) -> String {
    if let Ok(selector) = Selector::parse(r#"pre[id^="pre_"]"#) {
        let parts: Vec<String> = document
            .select(&selector)
            .take(3)
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if !parts.is_empty() {
            return cap_summary(&parts.join("\n\n"));
        }
    }

    if let Ok(selector) = Selector::parse("div.judgments") {
        if let Some(element) = document.select(&selector).next() {
            let text = element
                .text()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let start: String = text.chars().take(JUDGMENT_FALLBACK_CHARS).collect();
            if !start.is_empty() {
                return cap_summary(&start);
            }
        }
    }

    "N/A".to_string()
}

fn cap_summary(summary: &str) -> String {
    if summary.chars().count() > MAX_SUMMARY_CHARS {
        let truncated: String = summary.chars().take(MAX_SUMMARY_CHARS).collect();
        format!("{}...", truncated)
    } else {
        summary.to_string()
    }
}

// ============================================================================
// CSV Output
// ============================================================================

/// Write scraped cases to a CSV compatible with the precedent loader.
pub fn write_csv(cases: &[ScrapedCase], path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create CSV: {:?}", path))?;

    for case in cases {
        writer.serialize(case).context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV")?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_case_links_from_results() {
        let html = r#"
            <html><body>
                <div class="result"><a href="/doc/111/">Case one</a></div>
                <div class="result"><a href="/doc/222/">Case two</a></div>
                <div class="result"><a href="/search/?x=1">Not a doc</a></div>
                <div class="sidebar"><a href="/doc/333/">Outside results</a></div>
            </body></html>
        "#;

        let links = extract_case_links(html);
        assert_eq!(links, vec!["/doc/111/", "/doc/222/"]);
    }

    #[test]
    fn test_parse_case_page_with_headnotes() {
        let html = r#"
            <html>
                <head><title>State v. Example | Indian Kanoon</title></head>
                <body>
                    <div class="docsource_main">Supreme Court of India</div>
                    <pre id="pre_1">First headnote block.</pre>
                    <pre id="pre_2">Second headnote block.</pre>
                </body>
            </html>
        "#;

        let case = parse_case_page(html, "https://example.org/doc/111/");
        assert_eq!(case.case_name, "State v. Example");
        assert_eq!(case.citation, "Supreme Court of India");
        assert_eq!(case.link, "https://example.org/doc/111/");
        assert_eq!(
            case.summary_text,
            "First headnote block.\n\nSecond headnote block."
        );
    }

    #[test]
    fn test_parse_case_page_judgment_fallback() {
        let html = r#"
            <html>
                <head><title>State v. Fallback | Indian Kanoon</title></head>
                <body>
                    <div class="judgments">The accused was charged with theft under section 378.</div>
                </body>
            </html>
        "#;

        let case = parse_case_page(html, "https://example.org/doc/222/");
        assert_eq!(case.citation, "N/A");
        assert!(case.summary_text.contains("charged with theft"));
    }

    #[test]
    fn test_parse_case_page_missing_everything() {
        let case = parse_case_page("<html><body></body></html>", "x");
        assert_eq!(case.case_name, "N/A");
        assert_eq!(case.citation, "N/A");
        assert_eq!(case.summary_text, "N/A");
    }

    #[test]
    fn test_cap_summary_limit() {
        let short = "a".repeat(MAX_SUMMARY_CHARS);
        assert_eq!(cap_summary(&short), short);

        let long = "a".repeat(MAX_SUMMARY_CHARS + 10);
        let capped = cap_summary(&long);
        assert!(capped.ends_with("..."));
        assert_eq!(capped.chars().count(), MAX_SUMMARY_CHARS + 3);
    }

    #[test]
    fn test_write_csv_roundtrips_with_loader() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ipc_392_cases.csv");

        let cases = vec![ScrapedCase {
            case_name: "State v. Example".to_string(),
            citation: "AIR 1990 SC 123".to_string(),
            link: "https://example.org/doc/111/".to_string(),
            summary_text: "The accused robbed a traveller.".to_string(),
        }];

        write_csv(&cases, &path).unwrap();

        let rows = crate::ingest::read_case_file(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].case_name, "State v. Example");
        assert_eq!(rows[0].summary_text, "The accused robbed a traveller.");
    }
}
