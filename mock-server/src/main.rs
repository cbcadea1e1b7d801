use mock_server::MockConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let defaults = MockConfig::default();
    let config = MockConfig {
        secret: std::env::var("INGEST_SECRET").unwrap_or(defaults.secret),
        slug: std::env::var("BOARD_SLUG").unwrap_or(defaults.slug),
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, slug = %config.slug, "listening");
    mock_server::run_with(listener, config).await
}
