// src/routes.rs
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use log::{error, info};
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::ApiError;
use crate::handlers::{forecast, health, leads, market};
use crate::state::AppState;

const MAX_BODY_BYTES: u64 = 16 * 1024;

// Maps every rejection to a JSON error body
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status();
        message = api_error.message.clone();
    } else if let Some(body_error) = err.find::<BodyDeserializeError>() {
        code = StatusCode::BAD_REQUEST;
        message = format!("Invalid request body: {}", body_error);
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "Invalid query string".to_string();
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed".to_string();
    } else if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else {
        error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "success": false,
            "error": message,
        })),
        code,
    ))
}

fn with_state(state: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn rate_limited(state: Arc<AppState>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::addr::remote()
        .and(with_state(state))
        .and_then(|addr: Option<SocketAddr>, state: Arc<AppState>| async move {
            if state.limiter.check(addr.map(|a| a.ip())) {
                Ok(())
            } else {
                Err(warp::reject::custom(ApiError::too_many_requests()))
            }
        })
        .untuple_one()
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let forecast_route = warp::path!("calculations" / "forecast")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(forecast::calculate_forecast);

    let insights_route = warp::path!("calculations" / "market-insights")
        .and(warp::get())
        .and_then(forecast::market_insights);

    let market_current_route = warp::path!("market" / "current")
        .and(warp::get())
        .and(warp::query::<market::MarketQuery>())
        .and(with_state(state.clone()))
        .and_then(market::get_current_market);

    let market_rates_route = warp::path!("market" / "rates")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(market::get_rates);

    let contact_route = warp::path!("contact")
        .and(warp::post())
        .and(json_body())
        .and(warp::addr::remote())
        .and(with_state(state.clone()))
        .and_then(leads::submit_contact);

    let collect_email_route = warp::path!("collect-email")
        .and(warp::post())
        .and(json_body())
        .and(warp::addr::remote())
        .and(with_state(state.clone()))
        .and_then(leads::collect_email);

    let contacts_route = warp::path!("contacts")
        .and(warp::get())
        .and(warp::query::<leads::AdminQuery>())
        .and(with_state(state.clone()))
        .and_then(leads::list_contacts);

    let emails_route = warp::path!("emails")
        .and(warp::get())
        .and(warp::query::<leads::AdminQuery>())
        .and(with_state(state.clone()))
        .and_then(leads::list_emails);

    let api = warp::path("api").and(rate_limited(state)).and(
        forecast_route
            .or(insights_route)
            .or(market_current_route)
            .or(market_rates_route)
            .or(contact_route)
            .or(collect_email_route)
            .or(contacts_route)
            .or(emails_route),
    );

    let health_route = warp::path!("health")
        .and(warp::get())
        .and_then(health::health);

    info!("All routes configured successfully.");

    api.or(health_route).recover(handle_rejection)
}
