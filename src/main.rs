use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use easystonks::{
    config, routes,
    services::{alerts_store::JsonFileStore, coinmarketcap::CoinMarketCapClient},
    AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    if !settings.has_cmc_key() {
        tracing::warn!("COINMARKETCAP_API_KEY is not set, market data routes will fail");
    }

    let market = CoinMarketCapClient::from_settings(&settings).expect("Failed to build HTTP client");
    let alerts = JsonFileStore::new(&settings.alerts_path);
    tracing::info!(path = %alerts.path().display(), "alerts store");

    let state = AppState {
        settings: settings.clone(),
        market: Arc::new(market),
        alerts: Arc::new(alerts),
    };

    let app = routes::app(state);

    let host = settings
        .host
        .parse::<IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((host, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
