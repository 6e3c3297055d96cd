// src/services/mod.rs
pub mod cache;
pub mod forecast;
pub mod leads;
pub mod market_data;
pub mod projection;
pub mod sources;
pub mod throttle;
