// src/handlers/health.rs
use chrono::Utc;
use serde_json::json;
use warp::reply::Json;
use warp::Rejection;

pub async fn health() -> Result<Json, Rejection> {
    Ok(warp::reply::json(&json!({
        "status": "OK",
        "timestamp": Utc::now(),
    })))
}
