// src/bin/test_market_sources.rs
use dotenv::dotenv;
use log::{error, info};
use nest_value::config::Config;
use nest_value::services::market_data::MarketDataGateway;
use nest_value::services::sources::{http_client, CoinDesk, CoinGecko, QuoteSource, TreasuryYield};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    let client = http_client()?;

    let sources: Vec<Box<dyn QuoteSource>> = vec![
        Box::new(CoinGecko::new(client.clone())),
        Box::new(CoinDesk::new(client.clone())),
        Box::new(TreasuryYield::new(client)),
    ];

    for source in &sources {
        info!("Testing {}...", source.name());
        match tokio::time::timeout(config.source_timeout, source.fetch()).await {
            Ok(Ok(value)) => info!("SUCCESS: {} returned {}", source.name(), value),
            Ok(Err(e)) => error!("ERROR: {} failed: {}", source.name(), e),
            Err(_) => error!("ERROR: {} timed out after {:?}", source.name(), config.source_timeout),
        }
    }

    info!("Assembling a full market snapshot...");
    let gateway = MarketDataGateway::from_config(&config)?;
    let data = gateway.current(true).await;
    println!("{}", serde_json::to_string_pretty(data.snapshot.as_ref())?);

    Ok(())
}
