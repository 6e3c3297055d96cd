use anyhow::Context;
use dotenv::dotenv;
use log::{info, warn};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use nest_value::config::Config;
use nest_value::routes;
use nest_value::services::market_data::MarketDataGateway;
use nest_value::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize the logger
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    if env::var("PORT").is_err() {
        warn!("$PORT not set, defaulting to 5000");
    }
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Using PORT: {}", config.port);
    if config.admin_password.is_none() {
        warn!("ADMIN_PASSWORD not set, lead listing endpoints are disabled");
    }

    let gateway = MarketDataGateway::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to build market data gateway: {}", e))?;
    info!(
        "Market cache TTL {:?}, uncached fetch bounded by {:?}",
        config.market_cache_ttl,
        gateway.worst_case_latency()
    );

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    let state = Arc::new(AppState::new(config, gateway));

    // Set up CORS
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    // Set up routes
    let api = routes::routes(state).with(cors);
    info!("Routes configured successfully with CORS.");

    // Start the server
    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;

    Ok(())
}
