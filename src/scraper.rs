// src/scraper.rs
use anyhow::{Context, Result};
use regex::RegexBuilder;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{info, warn};

/// Downstream model calls carry a token budget; content past this point is
/// dropped rather than rejected.
const MAX_CONTENT_CHARS: usize = 6000;

/// Minimum cleaned length for a targeted selector region to count as the
/// job description rather than navigation chrome.
const MIN_TARGETED_CHARS: usize = 200;

const FETCH_TIMEOUT_SECS: u64 = 10;

/// Selectors for job-description containers on major job boards, most
/// specific first. Order is the tie-break: earlier entries win over the
/// generic patterns at the end.
const JOB_SELECTORS: &[&str] = &[
    ".jobs-search__job-details--container",
    ".job-details",
    ".jobs-description",
    ".jobsearch-jobDescriptionText",
    ".jobsearch-JobComponent-description",
    ".jobDescriptionContent",
    ".desc",
    "[class*=\"job-description\"]",
    "[class*=\"job-details\"]",
    "[class*=\"description\"]",
    "[id*=\"job-description\"]",
    "[id*=\"job-details\"]",
    "article",
    ".content",
    ".main-content",
    "[role=\"main\"]",
];

const JOB_KEYWORDS: &[&str] = &[
    "responsibilities",
    "requirements",
    "qualifications",
    "experience",
    "skills",
    "salary",
    "benefits",
    "location",
    "remote",
    "hybrid",
    "position",
    "role",
    "job",
    "career",
    "employment",
    "apply",
];

static NOISE_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    RegexBuilder::new(
        "Accept all cookies|Cookie preferences|Sign in to save|Create alert\
         |Share this job|Report this job|Skip to main content|Navigation menu",
    )
    .case_insensitive(true)
    .build()
    .expect("noise pattern is valid")
});

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub title: String,
    pub content: String,
    pub url: String,
    pub error: Option<String>,
}

impl ExtractionResult {
    fn failure(url: &str, error: String) -> Self {
        Self {
            success: false,
            title: String::new(),
            content: String::new(),
            url: url.to_string(),
            error: Some(error),
        }
    }
}

/// Fetches job posting pages and derives clean description text from them.
pub struct JobScraper {
    client: Client,
}

impl JobScraper {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36")
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch a URL and extract job posting content from it.
    ///
    /// Never fails outward: network errors, non-2xx responses, and empty
    /// pages all resolve to a result with `success: false`.
    pub async fn scrape_url(&self, url: &str) -> ExtractionResult {
        info!("Fetching job post: {}", url);

        match self.fetch(url).await {
            Ok(html) => {
                let result = extract_from_html(&html, url);
                info!(
                    "Extracted {} characters from {} ({})",
                    result.content.len(),
                    url,
                    result.title
                );
                result
            }
            Err(e) => {
                warn!("Failed to scrape {}: {}", url, e);
                ExtractionResult::failure(url, e.to_string())
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch job post")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        response.text().await.context("Failed to read response body")
    }
}

/// Extract job content from already-fetched HTML. Split out from the fetch so
/// the extraction strategy is testable without a network.
pub fn extract_from_html(html: &str, url: &str) -> ExtractionResult {
    let mut document = Html::parse_document(html);
    remove_non_content(&mut document);

    let content = extract_targeted(&document)
        .unwrap_or_else(|| extract_general(&document));

    let title = page_title(&document);

    ExtractionResult {
        success: true,
        title,
        content: content.chars().take(MAX_CONTENT_CHARS).collect(),
        url: url.to_string(),
        error: None,
    }
}

/// Strip markup that never carries job content: scripts, styles, and page
/// chrome such as navigation, headers, footers, and ad containers.
fn remove_non_content(document: &mut Html) {
    let selector = Selector::parse("script, style, nav, header, footer, aside, advertisement")
        .expect("non-content selector is valid");

    let ids: Vec<_> = document.select(&selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Targeted extraction: first selector region whose cleaned text is
/// substantial wins.
fn extract_targeted(document: &Html) -> Option<String> {
    for selector_str in JOB_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let content = clean_text(&element.text().collect::<Vec<_>>().join(" "));
            if content.len() > MIN_TARGETED_CHARS {
                return Some(content);
            }
        }
    }
    None
}

/// Fallback extraction: keep page text lines that either mention a
/// job-related keyword or are long enough to be descriptive prose.
fn extract_general(document: &Html) -> String {
    let survivors: Vec<&str> = document
        .root_element()
        .text()
        .flat_map(|chunk| chunk.lines())
        .map(str::trim)
        .filter(|line| line.len() > 10)
        .filter(|line| {
            let lower = line.to_lowercase();
            JOB_KEYWORDS.iter().any(|kw| lower.contains(kw)) || line.len() > 50
        })
        .collect();

    clean_text(&survivors.join(" "))
}

fn page_title(document: &Html) -> String {
    let selector = Selector::parse("title").expect("title selector is valid");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "No title found".to_string())
}

/// Collapse whitespace runs and remove known UI noise phrases.
fn clean_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    NOISE_PATTERN.replace_all(&collapsed, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_description() -> String {
        "We are hiring a senior engineer to build distributed systems. "
            .repeat(5)
    }

    #[test]
    fn test_targeted_extraction_wins_over_fallback() {
        let description = long_description();
        let html = format!(
            "<html><head><title>Senior Engineer - Acme</title></head><body>\
             <nav>Home Jobs About</nav>\
             <div class=\"job-details\">{}</div>\
             <p>salary information elsewhere on the page for the fallback</p>\
             </body></html>",
            description
        );

        let result = extract_from_html(&html, "https://example.com/job");
        assert!(result.success);
        assert_eq!(result.title, "Senior Engineer - Acme");
        assert!(result.content.starts_with("We are hiring a senior engineer"));
        assert!(!result.content.contains("elsewhere on the page"));
    }

    #[test]
    fn test_fallback_keeps_keyword_and_long_lines_in_order() {
        let html = "<html><body><div>\
                    short\n\
                    Key responsibilities include mentoring\n\
                    tiny line\n\
                    The salary range is competitive\n\
                    This line has no keyword but it is certainly longer than fifty characters\n\
                    nope\n\
                    </div></body></html>";

        let result = extract_from_html(html, "https://example.com/job");
        assert!(result.success);
        let content = &result.content;
        let responsibilities = content.find("Key responsibilities").unwrap();
        let salary = content.find("The salary range").unwrap();
        let long_line = content.find("no keyword but it is certainly").unwrap();
        assert!(responsibilities < salary && salary < long_line);
        assert!(!content.contains("tiny line"));
        assert!(!content.contains("nope"));
    }

    #[test]
    fn test_script_and_nav_are_stripped() {
        let description = long_description();
        let html = format!(
            "<html><body>\
             <script>var salary = 'responsibilities requirements';</script>\
             <div class=\"job-details\">{}</div></body></html>",
            description
        );

        let result = extract_from_html(&html, "https://example.com/job");
        assert!(!result.content.contains("var salary"));
    }

    #[test]
    fn test_noise_phrases_removed() {
        let html = format!(
            "<html><body><div class=\"job-details\">Accept all cookies {} Sign in to save</div>\
             </body></html>",
            long_description()
        );

        let result = extract_from_html(&html, "https://example.com/job");
        assert!(!result.content.contains("Accept all cookies"));
        assert!(!result.content.contains("Sign in to save"));
    }

    #[test]
    fn test_content_truncated_to_budget() {
        let html = format!(
            "<html><body><div class=\"job-details\">{}</div></body></html>",
            "responsibilities ".repeat(1000)
        );

        let result = extract_from_html(&html, "https://example.com/job");
        assert!(result.content.chars().count() <= MAX_CONTENT_CHARS);
    }

    #[test]
    fn test_missing_title_uses_placeholder() {
        let html = format!(
            "<html><body><div class=\"job-details\">{}</div></body></html>",
            long_description()
        );

        let result = extract_from_html(&html, "https://example.com/job");
        assert_eq!(result.title, "No title found");
    }
}
