use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port = std::env::var("GATEHOUSE_HTTP_PORT").unwrap_or_else(|_| "8080".to_string());
    let environment = std::env::var("GATEHOUSE_ENV").unwrap_or_else(|_| "development".to_string());
    info!(
        target: "gatehouse",
        "Gatehouse starting: RUST_LOG='{}', http_port={}, env='{}'",
        rust_log, http_port, environment
    );

    gatehouse::server::run().await
}
