// src/analyzer.rs
use crate::config::AppConfig;
use crate::llm::ModelAdapter;
use crate::scraper::JobScraper;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("failed to scrape job data from {url}: {cause}")]
pub struct ScrapeError {
    pub cause: String,
    pub url: String,
}

/// The analysis pipeline as seen by the webhook layer: URL in, raw model
/// text out. Normalization happens at the call site so the sync and async
/// paths apply it identically. A trait so endpoint behavior can be tested
/// against stubs.
#[async_trait]
pub trait AnalyzeJob: Send + Sync {
    async fn analyze(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Composes the scraper and the model adapter into one analyze operation.
pub struct JobAnalyzer {
    scraper: JobScraper,
    llm: ModelAdapter,
}

impl JobAnalyzer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let llm = ModelAdapter::new(
            &config.llm_provider,
            config.llm_api_key.clone(),
            config.llm_model_name.clone(),
        )?;

        Ok(Self {
            scraper: JobScraper::new()?,
            llm,
        })
    }

    /// Ask the model about extracted job content. With a question this is
    /// free-form Q&A; without one the model is asked for the structured
    /// extraction object. Always returns text; call failures are encoded in
    /// the response string by the adapter.
    pub async fn analyze_job_post(&self, content: &str, question: Option<&str>) -> String {
        let prompt = match question {
            Some(question) => question_prompt(content, question),
            None => extraction_prompt(content),
        };
        self.llm.generate_text(&prompt).await
    }
}

#[async_trait]
impl AnalyzeJob for JobAnalyzer {
    async fn analyze(&self, url: &str) -> Result<String, ScrapeError> {
        let scraped = self.scraper.scrape_url(url).await;
        if !scraped.success {
            return Err(ScrapeError {
                cause: scraped
                    .error
                    .unwrap_or_else(|| "unknown scrape failure".to_string()),
                url: url.to_string(),
            });
        }

        info!("Analyzing job post: {} ({})", scraped.title, url);
        Ok(self.analyze_job_post(&scraped.content, None).await)
    }
}

fn question_prompt(content: &str, question: &str) -> String {
    format!(
        "Based on the following job post content, please answer this question: {question}\n\
         \n\
         Job Post Content:\n\
         {content}\n\
         \n\
         Please provide a helpful and accurate answer based on the job post information.\n"
    )
}

fn extraction_prompt(content: &str) -> String {
    format!(
        r#"Analyze the following job post and extract the relevant information.
Respond ONLY with a valid JSON object, without any code block formatting or extra text.
The "summary" field must be a nested JSON object.

JSON format:
{{
  "job_title": "",
  "company_name": "",
  "key_responsibilities": [],
  "required_qualifications": [],
  "preferred_skills": [],
  "salary_compensation": "",
  "location_remote_options": "",
  "other_important_details": "",
  "potential_red_flags": "",
  "overall_impression": "",
  "summary": {{
    "salary": "",
    "remote_or_onsite": "",
    "skills": [],
    "experience_years": "",
    "main_responsibility": ""
  }}
}}

- Fill each field with the relevant information from the job post.
- For lists, use JSON arrays.
- If a field is not mentioned, leave it as an empty string or empty array.

Job Post Content:
{content}
"#
    )
}
