// src/web/mod.rs

pub mod guards;
pub mod handlers;
pub mod types;

use crate::analyzer::{AnalyzeJob, JobAnalyzer};
use crate::callback::CallbackDispatcher;
use crate::config::AppConfig;
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use tracing::info;

use guards::{RejectionDetail, VerifiedWebhook};
use types::{AnalysisOutcome, ErrorDetail, HealthResponse};

// CORS Fairing
pub struct Cors {
    allowed_origins: String,
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new(
            "Access-Control-Allow-Origin",
            self.allowed_origins.clone(),
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[post("/job-analysis", data = "<payload>")]
pub async fn job_analysis_webhook(
    payload: VerifiedWebhook,
    analyzer: &State<Arc<dyn AnalyzeJob>>,
    dispatcher: &State<Arc<CallbackDispatcher>>,
) -> Result<Json<AnalysisOutcome>, Custom<Json<ErrorDetail>>> {
    handlers::job_analysis_handler(
        payload.0,
        analyzer.inner().clone(),
        dispatcher.inner().clone(),
    )
    .await
}

#[get("/health")]
pub async fn webhook_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "webhook-handler",
    })
}

#[get("/")]
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "Welcome to the Job Analysis API"}))
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers. Guards stash their detail message in the request-local
// cache; the catchers read it back so rejection bodies carry the cause.

#[rocket::catch(401)]
pub fn unauthorized(req: &Request) -> Json<ErrorDetail> {
    let detail = req.local_cache(|| RejectionDetail("Invalid webhook signature".to_string()));
    Json(ErrorDetail::new(detail.0.clone()))
}

#[rocket::catch(422)]
pub fn unprocessable(req: &Request) -> Json<ErrorDetail> {
    let detail = req.local_cache(|| RejectionDetail("Invalid request payload".to_string()));
    Json(ErrorDetail::new(detail.0.clone()))
}

#[rocket::catch(400)]
pub fn bad_request(req: &Request) -> Json<ErrorDetail> {
    let detail = req.local_cache(|| RejectionDetail("Invalid request".to_string()));
    Json(ErrorDetail::new(detail.0.clone()))
}

#[rocket::catch(413)]
pub fn payload_too_large(req: &Request) -> Json<ErrorDetail> {
    let detail = req.local_cache(|| RejectionDetail("Request body too large".to_string()));
    Json(ErrorDetail::new(detail.0.clone()))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<ErrorDetail> {
    Json(ErrorDetail::new("Internal server error"))
}

/// Assemble the Rocket instance. Split from `start_web_server` so tests can
/// mount the same routes over a stub analyzer.
pub fn build_rocket(
    config: AppConfig,
    analyzer: Arc<dyn AnalyzeJob>,
    dispatcher: Arc<CallbackDispatcher>,
) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("port", config.port))
        .merge(("address", "0.0.0.0"));

    rocket::custom(figment)
        .attach(Cors {
            allowed_origins: config.allowed_origins.clone(),
        })
        .manage(config)
        .manage(analyzer)
        .manage(dispatcher)
        .register(
            "/",
            catchers![
                unauthorized,
                unprocessable,
                bad_request,
                payload_too_large,
                internal_error
            ],
        )
        .mount("/", routes![root, options])
        .mount("/webhooks", routes![job_analysis_webhook, webhook_health])
}

// Main server start function
pub async fn start_web_server(config: AppConfig) -> Result<()> {
    let analyzer: Arc<dyn AnalyzeJob> = Arc::new(JobAnalyzer::new(&config)?);
    let dispatcher = Arc::new(CallbackDispatcher::new(config.webhook_secret.clone())?);

    info!("Starting Job Analysis Webhook server on port {}", config.port);

    build_rocket(config, analyzer, dispatcher).launch().await?;

    Ok(())
}
