// src/web/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound webhook envelope. Immutable once validated; consumed by the
/// pipeline and never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub job_id: String,
    pub url: String,
    #[serde(default = "default_async_processing")]
    pub async_processing: bool,
    #[serde(default)]
    pub callback_url: Option<String>,
}

fn default_async_processing() -> bool {
    true
}

impl AnalysisRequest {
    /// Enforce envelope invariants: non-empty job_id, https URLs only.
    /// Returns the trimmed request or the first violation's message.
    pub fn validated(mut self) -> Result<Self, String> {
        self.job_id = self.job_id.trim().to_string();
        if self.job_id.is_empty() {
            return Err("job_id cannot be empty".to_string());
        }

        if !self.url.starts_with("https") {
            return Err("A valid job post URL is required".to_string());
        }

        if let Some(callback_url) = self.callback_url.take() {
            let callback_url = callback_url.trim().to_string();
            if callback_url.is_empty() {
                return Err("callback_url cannot be empty".to_string());
            }
            if !callback_url.starts_with("https") {
                return Err("callback_url must be a valid HTTPS URL".to_string());
            }
            self.callback_url = Some(callback_url);
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Completed,
    Accepted,
    Failed,
    Error,
}

/// The only externally observable artifact of a run: the synchronous
/// response body and the callback payload are both this shape.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub status: OutcomeStatus,
    pub job_id: String,
    pub result: Option<Map<String, Value>>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisOutcome {
    fn new(status: OutcomeStatus, job_id: &str, result: Option<Map<String, Value>>) -> Self {
        let message = match status {
            OutcomeStatus::Completed => "Job analysis completed successfully",
            OutcomeStatus::Accepted => "Job analysis started in background",
            OutcomeStatus::Failed => "Failed to scrape job data",
            OutcomeStatus::Error => "Job analysis failed due to an error",
        };

        Self {
            status,
            job_id: job_id.to_string(),
            result,
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn completed(job_id: &str, result: Map<String, Value>) -> Self {
        Self::new(OutcomeStatus::Completed, job_id, Some(result))
    }

    pub fn accepted(job_id: &str) -> Self {
        Self::new(OutcomeStatus::Accepted, job_id, None)
    }

    pub fn failed(job_id: &str) -> Self {
        Self::new(OutcomeStatus::Failed, job_id, None)
    }

    pub fn error(job_id: &str) -> Self {
        Self::new(OutcomeStatus::Error, job_id, None)
    }
}

/// Error body shape shared by all non-2xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}
