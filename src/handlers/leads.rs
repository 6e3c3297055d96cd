// src/handlers/leads.rs
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use crate::services::leads::{ConsultationForm, ContactForm};
use crate::state::AppState;
use super::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub password: Option<String>,
}

fn client_ip(addr: Option<SocketAddr>) -> String {
    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn authorize(query: &AdminQuery, state: &AppState) -> Result<(), Rejection> {
    match (&state.config.admin_password, &query.password) {
        (Some(expected), Some(given)) if expected == given => Ok(()),
        _ => {
            warn!("Rejected admin listing request");
            Err(warp::reject::custom(ApiError::unauthorized()))
        }
    }
}

pub async fn submit_contact(
    form: ContactForm,
    addr: Option<SocketAddr>,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    info!("Handling contact form submission");

    state
        .leads
        .add_contact(form, client_ip(addr))
        .map_err(|e| warp::reject::custom(ApiError::bad_request(e.to_string())))?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "message": "Contact form submitted successfully",
    })))
}

pub async fn collect_email(
    form: ConsultationForm,
    addr: Option<SocketAddr>,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    info!("Handling consultation email submission");

    state
        .leads
        .add_consultation(form, client_ip(addr))
        .map_err(|e| warp::reject::custom(ApiError::bad_request(e.to_string())))?;

    Ok(warp::reply::json(&json!({
        "success": true,
        "message": "Email collected successfully",
    })))
}

pub async fn list_contacts(query: AdminQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    authorize(&query, &state)?;
    Ok(warp::reply::json(&state.leads.contacts()))
}

pub async fn list_emails(query: AdminQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    authorize(&query, &state)?;
    Ok(warp::reply::json(&state.leads.consultations()))
}
