// src/handlers/market.rs
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::models::{ApiResponse, AssetClass};
use crate::services::market_data::{MarketSnapshot, SourceStatus};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MarketQuery {
    pub refresh: Option<String>,
}

impl MarketQuery {
    fn wants_refresh(&self) -> bool {
        self.refresh.as_deref().map(str::trim) == Some("true")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarketMeta {
    last_updated: DateTime<Utc>,
    cached: bool,
    api_status: BTreeMap<AssetClass, SourceStatus>,
    data_freshness: serde_json::Value,
}

fn freshness(snapshot: &MarketSnapshot) -> serde_json::Value {
    let live_or = |asset: AssetClass, otherwise: &str| match snapshot.status_of(asset) {
        Some(SourceStatus::Success) => "live".to_string(),
        _ => otherwise.to_string(),
    };
    json!({
        "crypto": live_or(AssetClass::Crypto, "unavailable"),
        "bonds": live_or(AssetClass::Bonds, "fallback"),
        "other": "historical_averages",
    })
}

pub async fn get_current_market(query: MarketQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request to get current market data");

    let mut force_refresh = query.wants_refresh();
    let mut throttled = false;
    if force_refresh && !state.refresh_cooldown.try_acquire() {
        info!("Refresh requested inside cooldown, serving cached data");
        force_refresh = false;
        throttled = true;
    }

    let data = state.gateway.current(force_refresh).await;
    let message = if force_refresh {
        "Market data refreshed successfully"
    } else if throttled {
        "Market data retrieved successfully (refresh cooldown active)"
    } else if data.cached {
        "Market data retrieved successfully (cached)"
    } else {
        "Market data retrieved successfully"
    };

    let snapshot = data.snapshot.as_ref();
    Ok(warp::reply::json(&ApiResponse::ok(
        message,
        snapshot,
        MarketMeta {
            last_updated: snapshot.fetched_at,
            cached: data.cached,
            api_status: snapshot.api_status(),
            data_freshness: freshness(snapshot),
        },
    )))
}

pub async fn get_rates(state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request to get investment rates");

    let data = state.gateway.current(false).await;
    Ok(warp::reply::json(&ApiResponse::ok(
        "Investment rates retrieved successfully",
        data.snapshot.rates(),
        json!({
            "lastUpdated": data.snapshot.fetched_at,
            "source": "Mixed: Live data where available, historical averages otherwise",
            "format": "decimal_percentage",
        }),
    )))
}
