// src/state.rs
use std::sync::Arc;

use crate::config::Config;
use crate::services::leads::LeadStore;
use crate::services::market_data::MarketDataGateway;
use crate::services::throttle::{Cooldown, RateLimiter};

/// Shared state handed to every route.
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<MarketDataGateway>,
    pub leads: LeadStore,
    pub limiter: RateLimiter,
    pub refresh_cooldown: Cooldown,
}

impl AppState {
    pub fn new(config: Config, gateway: MarketDataGateway) -> Self {
        AppState {
            limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            refresh_cooldown: Cooldown::new(config.refresh_cooldown),
            gateway: Arc::new(gateway),
            leads: LeadStore::with_capacity(config.lead_capacity),
            config,
        }
    }
}
