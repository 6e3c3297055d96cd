// src/handlers/forecast.rs
use chrono::{DateTime, Datelike, Utc};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::models::{ApiResponse, AssetRates};
use crate::services::forecast::{project, ForecastRequest};
use crate::state::AppState;
use super::error::ApiError;

const DISCLAIMER: &str = "Projections based on historical averages and current market conditions. \
Past performance does not guarantee future results.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastMeta {
    last_updated: DateTime<Utc>,
    rates_source: &'static str,
    rates: AssetRates,
    disclaimer: &'static str,
}

/// Rates from the market gateway, or the built-in table if it does not answer in time.
/// The gateway call runs on its own task so a slow fetch still lands in the cache.
async fn rates_for_forecast(state: &AppState) -> (AssetRates, &'static str) {
    let gateway = state.gateway.clone();
    let fetch = tokio::spawn(async move { gateway.current(false).await });

    match tokio::time::timeout(state.config.forecast_rates_timeout, fetch).await {
        Ok(Ok(data)) => (
            data.snapshot.rates(),
            "Current market data + historical averages",
        ),
        Ok(Err(e)) => {
            error!("Market data task failed: {}", e);
            (AssetRates::historical(), "Historical averages")
        }
        Err(_) => {
            warn!(
                "Market data not ready within {:?}, using historical averages",
                state.config.forecast_rates_timeout
            );
            (AssetRates::historical(), "Historical averages")
        }
    }
}

pub async fn calculate_forecast(request: ForecastRequest, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling forecast request: {:?}", request);

    let input = request.validate(Utc::now().year()).map_err(|e| {
        warn!("Rejected forecast request: {}", e);
        warp::reject::custom(ApiError::bad_request(e.to_string()))
    })?;

    let (rates, rates_source) = rates_for_forecast(&state).await;
    let result = project(input, &rates);

    info!(
        "Forecast over {} years, best performer {}",
        result.input.years, result.summary.best_performer.asset
    );

    Ok(warp::reply::json(&ApiResponse::ok(
        "Investment projections calculated successfully",
        result,
        ForecastMeta {
            last_updated: Utc::now(),
            rates_source,
            rates,
            disclaimer: DISCLAIMER,
        },
    )))
}

pub async fn market_insights() -> Result<Json, Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(
        "Market insights retrieved successfully",
        json!({
            "currentMarketCondition": "Moderate volatility",
            "recommendations": {
                "conservative": "Focus on high-yield savings and Treasury bonds in current rate environment",
                "moderate": "Balanced portfolio with 60% stocks, 30% bonds, 10% alternatives",
                "aggressive": "Higher stock allocation but consider dollar-cost averaging"
            },
            "marketTrends": {
                "High-yield savings": "Rates at multi-year highs (4-5.5% APY)",
                "Stock market": "Historical averages suggest 7-10% long-term returns",
                "Bond yields": "10-year Treasury around 4.2%, attractive for conservative investors",
                "Gold": "Traditional inflation hedge, moderate long-term returns",
                "Cryptocurrency": "Extremely volatile, only for risk-tolerant investors"
            },
            "riskWarnings": {
                "crypto": "Cryptocurrency is highly volatile and speculative",
                "stocks": "Market can experience significant short-term volatility",
                "general": "Past performance does not guarantee future results"
            }
        }),
        json!({
            "lastUpdated": Utc::now(),
            "insightType": "general_recommendations"
        }),
    )))
}
