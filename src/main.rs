use anyhow::Result;
use jobhook::{start_web_server, AppConfig};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

#[tokio::main]
async fn main() -> Result<()> {
    Registry::default()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or(EnvFilter::new("jobhook=info,rocket::server=off")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("Starting Job Analysis Webhook Service");
    info!("Server: http://0.0.0.0:{}", config.port);

    start_web_server(config).await
}
