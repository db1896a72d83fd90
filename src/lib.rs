pub mod analyzer;
pub mod callback;
pub mod config;
pub mod llm;
pub mod normalize;
pub mod scraper;
pub mod signature;
pub mod web;

pub use config::AppConfig;
pub use web::start_web_server;
