use std::sync::Arc;

use tokio::sync::RwLock;

use liqscope::api::router::create_router;
use liqscope::config::AppConfig;
use liqscope::hyperliquid::InfoClient;
use liqscope::services::run_position_poller;
use liqscope::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Arc::new(AppConfig::from_env()?);
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = liqscope::metrics::init_metrics()?;

    tracing::info!(
        profile = %config.profile,
        min_position_value = %config.min_position_value,
        max_workers = config.max_workers,
        addresses_file = %config.addresses_file.display(),
        api_url = %config.api_url,
        "Configuration loaded"
    );

    let latest = Arc::new(RwLock::new(None));

    // --- Position poller: fetch → normalize → analyze, one cycle at a time ---
    let client = InfoClient::with_base_url(reqwest::Client::new(), &config.api_url);
    let poller_config = config.clone();
    let poller_latest = latest.clone();
    tokio::spawn(async move {
        let prices = client.clone();
        run_position_poller(client, prices, poller_config, poller_latest).await;
    });

    let state = AppState {
        config,
        latest,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
