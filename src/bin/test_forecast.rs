// src/bin/test_forecast.rs
use chrono::{Datelike, Utc};
use dotenv::dotenv;
use log::{error, info};
use std::env;

use nest_value::models::{AssetRates, Money};
use nest_value::services::forecast::{forecast, ForecastRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let current_year = Utc::now().year();
    let request = ForecastRequest {
        amount: env::var("AMOUNT").unwrap_or_else(|_| "10000".to_string()).parse()?,
        monthly_contribution: Some(
            env::var("MONTHLY")
                .map(|m| m.parse::<Money>())
                .unwrap_or(Ok(Money::ZERO))?,
        ),
        target_year: match env::var("TARGET_YEAR") {
            Ok(year) => year.parse()?,
            Err(_) => current_year + 10,
        },
        risk_profile: env::var("RISK_PROFILE").unwrap_or_else(|_| "moderate".to_string()),
    };

    info!("Running forecast with historical rates: {:?}", request);
    match forecast(&request, current_year, &AssetRates::historical()) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            info!(
                "Best performer: {} at {}",
                result.summary.best_performer.name, result.summary.best_performer.value
            );
        }
        Err(e) => {
            error!("Forecast rejected: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
