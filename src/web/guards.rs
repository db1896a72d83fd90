// src/web/guards.rs
use crate::config::AppConfig;
use crate::signature;
use crate::web::types::AnalysisRequest;
use rocket::data::{self, Data, FromData, ToByteUnit};
use rocket::http::Status;
use rocket::Request;
use tracing::warn;

/// Why a webhook envelope was rejected before reaching the handler.
#[derive(Debug)]
pub enum WebhookRejection {
    /// Signature missing or invalid (401).
    Authentication(String),
    /// Envelope malformed or violating field invariants (422).
    Validation(String),
    /// Body could not be read (400).
    Payload(String),
}

/// Detail message stashed for the error catchers, which cannot see the
/// guard's error value directly.
pub struct RejectionDetail(pub String);

/// Data guard for the inbound webhook: reads the raw body, verifies the
/// `X-Webhook-Signature` header over those exact bytes, then parses and
/// validates the envelope.
///
/// Verification is skipped when no secret is configured; that permissive
/// default is a deployment decision, not a guarantee of the codec.
pub struct VerifiedWebhook(pub AnalysisRequest);

#[rocket::async_trait]
impl<'r> FromData<'r> for VerifiedWebhook {
    type Error = WebhookRejection;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        let limit = req.limits().get("json").unwrap_or_else(|| 1.mebibytes());

        let bytes = match data.open(limit).into_bytes().await {
            Ok(buf) if buf.is_complete() => buf.into_inner(),
            Ok(_) => {
                return reject(
                    req,
                    Status::PayloadTooLarge,
                    WebhookRejection::Payload("Request body too large".to_string()),
                )
            }
            Err(e) => {
                return reject(
                    req,
                    Status::BadRequest,
                    WebhookRejection::Payload(format!("Failed to read request body: {}", e)),
                )
            }
        };

        let secret = req
            .rocket()
            .state::<AppConfig>()
            .and_then(|config| config.webhook_secret.as_deref());

        if let Some(secret) = secret {
            match req.headers().get_one("X-Webhook-Signature") {
                None => {
                    warn!("Webhook request rejected: missing signature");
                    return reject(
                        req,
                        Status::Unauthorized,
                        WebhookRejection::Authentication("Missing webhook signature".to_string()),
                    );
                }
                Some(header) if !signature::verify(secret, &bytes, header) => {
                    warn!("Webhook request rejected: invalid signature");
                    return reject(
                        req,
                        Status::Unauthorized,
                        WebhookRejection::Authentication("Invalid webhook signature".to_string()),
                    );
                }
                Some(_) => {}
            }
        }

        let parsed: AnalysisRequest = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                return reject(
                    req,
                    Status::UnprocessableEntity,
                    WebhookRejection::Validation(format!("Invalid request body: {}", e)),
                )
            }
        };

        match parsed.validated() {
            Ok(request) => data::Outcome::Success(VerifiedWebhook(request)),
            Err(message) => reject(
                req,
                Status::UnprocessableEntity,
                WebhookRejection::Validation(message),
            ),
        }
    }
}

fn reject<'r>(
    req: &'r Request<'_>,
    status: Status,
    rejection: WebhookRejection,
) -> data::Outcome<'r, VerifiedWebhook> {
    let detail = match &rejection {
        WebhookRejection::Authentication(msg)
        | WebhookRejection::Validation(msg)
        | WebhookRejection::Payload(msg) => msg.clone(),
    };
    req.local_cache(|| RejectionDetail(detail));
    data::Outcome::Error((status, rejection))
}
