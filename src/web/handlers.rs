// src/web/handlers.rs
use crate::analyzer::AnalyzeJob;
use crate::callback::CallbackDispatcher;
use crate::normalize::normalize_llm_output;
use crate::web::types::{AnalysisOutcome, AnalysisRequest, ErrorDetail};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use std::sync::Arc;
use tracing::{error, info};

type HandlerResult = Result<Json<AnalysisOutcome>, Custom<Json<ErrorDetail>>>;

pub async fn job_analysis_handler(
    request: AnalysisRequest,
    analyzer: Arc<dyn AnalyzeJob>,
    dispatcher: Arc<CallbackDispatcher>,
) -> HandlerResult {
    info!("Processing job analysis for job_id: {}", request.job_id);

    if request.async_processing {
        let job_id = request.job_id.clone();
        // Fire and forget: the response goes out now, the work runs
        // detached, and its failures are only observable via the callback
        // or the logs.
        tokio::spawn(async move {
            process_job_in_background(request, analyzer, dispatcher).await;
        });
        return Ok(Json(AnalysisOutcome::accepted(&job_id)));
    }

    let raw = match analyzer.analyze(&request.url).await {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to scrape job data for job_id {}: {}", request.job_id, e);
            return Err(Custom(
                Status::BadRequest,
                Json(ErrorDetail::new("Failed to scrape job data")),
            ));
        }
    };

    match normalize_llm_output(&raw) {
        Ok(result) => {
            info!("Job analysis completed for job_id: {}", request.job_id);
            Ok(Json(AnalysisOutcome::completed(&request.job_id, result)))
        }
        Err(e) => {
            error!(
                "Failed to parse LLM output as JSON for job_id {}: {}; output was: {}",
                request.job_id, e.reason, e.raw_output
            );
            Err(Custom(
                Status::InternalServerError,
                Json(ErrorDetail::new(format!("Internal server error: {}", e))),
            ))
        }
    }
}

/// Out-of-band half of the async branch. Never propagates: every failure
/// path becomes an outcome, and the outcome either goes to the callback URL
/// or only to the logs.
pub async fn process_job_in_background(
    request: AnalysisRequest,
    analyzer: Arc<dyn AnalyzeJob>,
    dispatcher: Arc<CallbackDispatcher>,
) {
    let outcome = match analyzer.analyze(&request.url).await {
        Ok(raw) => match normalize_llm_output(&raw) {
            Ok(result) => {
                info!("Job analysis completed for job_id: {}", request.job_id);
                AnalysisOutcome::completed(&request.job_id, result)
            }
            Err(e) => {
                error!(
                    "Background processing failed for job_id {}: {}; output was: {}",
                    request.job_id, e.reason, e.raw_output
                );
                AnalysisOutcome::error(&request.job_id)
            }
        },
        Err(e) => {
            error!(
                "Failed to scrape job data for job_id {}: {}",
                request.job_id, e
            );
            AnalysisOutcome::failed(&request.job_id)
        }
    };

    match &request.callback_url {
        Some(callback_url) => dispatcher.deliver(callback_url, &outcome).await,
        None => info!(
            "No callback_url for job_id {}; outcome: {:?}",
            request.job_id, outcome.status
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalyzeJob, ScrapeError};
    use crate::signature;
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::{timeout, Duration};

    struct StubAnalyzer {
        /// Raw model text to return; `None` simulates a scrape failure.
        reply: Option<String>,
    }

    #[async_trait]
    impl AnalyzeJob for StubAnalyzer {
        async fn analyze(&self, url: &str) -> Result<String, ScrapeError> {
            match &self.reply {
                Some(raw) => Ok(raw.clone()),
                None => Err(ScrapeError {
                    cause: "HTTP error: 404 Not Found".to_string(),
                    url: url.to_string(),
                }),
            }
        }
    }

    /// Accept one HTTP request on the listener, answer 200, and return the
    /// signature header (if any) and the raw body bytes as received.
    async fn receive_callback(listener: TcpListener) -> (Option<String>, Vec<u8>) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers arrived");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
        };

        let headers = String::from_utf8(buf[..header_end].to_vec()).unwrap();
        let header_value = |name: &str| {
            headers.lines().find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case(name)
                    .then(|| value.trim().to_string())
            })
        };

        let content_length: usize = header_value("content-length").unwrap().parse().unwrap();
        let body_start = header_end + 4;
        while buf.len() < body_start + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();

        (
            header_value("x-webhook-signature"),
            buf[body_start..body_start + content_length].to_vec(),
        )
    }

    /// Run the background half against a stub and capture what the callback
    /// endpoint received.
    async fn run_background_with_callback(reply: Option<String>) -> (Option<String>, Vec<u8>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let receiver = tokio::spawn(receive_callback(listener));

        let request = AnalysisRequest {
            job_id: "j1".to_string(),
            url: "https://x".to_string(),
            async_processing: true,
            callback_url: Some(format!("http://{}", addr)),
        };
        let analyzer: Arc<dyn AnalyzeJob> = Arc::new(StubAnalyzer { reply });
        let dispatcher = Arc::new(CallbackDispatcher::new(Some("secret".to_string())).unwrap());

        process_job_in_background(request, analyzer, dispatcher).await;

        timeout(Duration::from_secs(2), receiver)
            .await
            .expect("callback never arrived")
            .unwrap()
    }

    #[tokio::test]
    async fn test_background_completion_delivers_signed_callback() {
        let (sig, body) =
            run_background_with_callback(Some(r#"{"job_title":"Eng"}"#.to_string())).await;

        let sig = sig.expect("callback carried no signature header");
        assert!(signature::verify("secret", &body, &sig));

        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["status"], "completed");
        assert_eq!(payload["job_id"], "j1");
        assert_eq!(payload["result"]["job_title"], "Eng");
        assert_eq!(payload["message"], "Job analysis completed successfully");
    }

    #[tokio::test]
    async fn test_background_scrape_failure_delivers_failed_callback() {
        let (sig, body) = run_background_with_callback(None).await;

        let sig = sig.expect("callback carried no signature header");
        assert!(signature::verify("secret", &body, &sig));

        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["status"], "failed");
        assert_eq!(payload["job_id"], "j1");
        assert!(payload["result"].is_null());
        assert_eq!(payload["message"], "Failed to scrape job data");
    }

    #[tokio::test]
    async fn test_background_bad_model_output_delivers_error_callback() {
        let (sig, body) =
            run_background_with_callback(Some("the model wrote prose instead".to_string())).await;

        assert!(signature::verify("secret", &body, &sig.unwrap()));

        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["status"], "error");
        assert!(payload["result"].is_null());
        assert_eq!(payload["message"], "Job analysis failed due to an error");
    }
}
