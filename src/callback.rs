// src/callback.rs
use crate::signature;
use crate::web::types::AnalysisOutcome;
use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{error, info, warn};

const DELIVERY_TIMEOUT_SECS: u64 = 30;

/// Delivers analysis outcomes to caller-supplied callback endpoints.
///
/// Best-effort only: every failure is logged with the job id and swallowed.
/// There is no retry and no dead-letter mechanism.
pub struct CallbackDispatcher {
    client: Client,
    secret: Option<String>,
}

impl CallbackDispatcher {
    pub fn new(secret: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, secret })
    }

    pub async fn deliver(&self, callback_url: &str, outcome: &AnalysisOutcome) {
        match self.try_deliver(callback_url, outcome).await {
            Ok(()) => info!("Webhook sent successfully for job_id: {}", outcome.job_id),
            Err(e) => error!(
                "Failed to send webhook for job_id {}: {}",
                outcome.job_id, e
            ),
        }
    }

    async fn try_deliver(&self, callback_url: &str, outcome: &AnalysisOutcome) -> Result<()> {
        let body = canonical_bytes(outcome)?;

        // The signed bytes are posted verbatim so the receiver's check
        // computes over exactly what was signed.
        let mut request = self
            .client
            .post(callback_url)
            .header("Content-Type", "application/json")
            .body(body.clone());

        match &self.secret {
            Some(secret) => {
                request = request.header("X-Webhook-Signature", signature::sign(secret, &body));
            }
            None => warn!(
                "No webhook secret configured; sending unsigned callback for job_id: {}",
                outcome.job_id
            ),
        }

        let response = request
            .send()
            .await
            .context("Failed to reach callback endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("callback endpoint returned {}", response.status());
        }

        Ok(())
    }
}

/// Canonical JSON serialization: sorted keys, no insignificant whitespace.
/// Going through `serde_json::Value` sorts object keys (its map is
/// BTreeMap-backed), so signer and verifier agree byte for byte.
pub fn canonical_bytes(outcome: &AnalysisOutcome) -> Result<Vec<u8>> {
    let value = serde_json::to_value(outcome).context("Failed to serialize outcome")?;
    serde_json::to_vec(&value).context("Failed to encode outcome")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    #[test]
    fn test_canonical_bytes_sorted_and_compact() {
        let mut result = Map::new();
        result.insert("z_last".to_string(), Value::from("v"));
        result.insert("a_first".to_string(), Value::from(1));
        let outcome = AnalysisOutcome::completed("j1", result);

        let body = String::from_utf8(canonical_bytes(&outcome).unwrap()).unwrap();
        assert!(!body.contains(": "), "no whitespace after separators");
        let job_id = body.find("\"job_id\"").unwrap();
        let message = body.find("\"message\"").unwrap();
        let status = body.find("\"status\"").unwrap();
        assert!(job_id < message && message < status, "keys sorted");
        let a_first = body.find("a_first").unwrap();
        let z_last = body.find("z_last").unwrap();
        assert!(a_first < z_last, "nested keys sorted");
    }

    #[test]
    fn test_canonical_bytes_verify_with_signature() {
        let outcome = AnalysisOutcome::failed("j1");
        let body = canonical_bytes(&outcome).unwrap();
        let header = signature::sign("secret", &body);
        assert!(signature::verify("secret", &body, &header));
    }
}
