// src/services/leads.rs
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{OnceLock, RwLock};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum LeadError {
    #[error("{0}")]
    MissingFields(&'static str),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Unread,
}

/// Contact form as posted; every field is optional here so missing ones
/// can be reported together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationForm {
    pub email: Option<String>,
    pub investment_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub status: LeadStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRequest {
    pub id: Uuid,
    pub email: String,
    pub investment_data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub status: LeadStatus,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

fn required(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn checked_email(raw: String) -> Result<String, LeadError> {
    if email_pattern().is_match(&raw) {
        Ok(raw)
    } else {
        Err(LeadError::InvalidEmail(raw))
    }
}

fn client_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    match raw.map(DateTime::parse_from_rfc3339) {
        Some(Ok(ts)) => ts.with_timezone(&Utc),
        Some(Err(e)) => {
            debug!("Ignoring unparseable client timestamp: {}", e);
            Utc::now()
        }
        None => Utc::now(),
    }
}

pub const DEFAULT_LEAD_CAPACITY: usize = 10_000;

/// Appends `item`, dropping the oldest entries once `capacity` is reached.
fn push_bounded<T>(items: &RwLock<VecDeque<T>>, item: T, capacity: usize, kind: &str) {
    let mut items = items.write().unwrap_or_else(|e| e.into_inner());
    while items.len() >= capacity.max(1) {
        items.pop_front();
        warn!("Lead store full ({} {}), evicted the oldest", capacity, kind);
    }
    items.push_back(item);
}

/// In-memory store for contact messages and consultation requests.
/// Each list keeps at most `capacity` entries, evicting the oldest first.
pub struct LeadStore {
    capacity: usize,
    contacts: RwLock<VecDeque<ContactSubmission>>,
    consultations: RwLock<VecDeque<ConsultationRequest>>,
}

impl LeadStore {
    pub fn with_capacity(capacity: usize) -> Self {
        LeadStore {
            capacity,
            contacts: RwLock::new(VecDeque::new()),
            consultations: RwLock::new(VecDeque::new()),
        }
    }

    pub fn add_contact(&self, form: ContactForm, ip: String) -> Result<ContactSubmission, LeadError> {
        let (name, email, subject, message) = match (
            required(&form.name),
            required(&form.email),
            required(&form.subject),
            required(&form.message),
        ) {
            (Some(name), Some(email), Some(subject), Some(message)) => (name, email, subject, message),
            _ => return Err(LeadError::MissingFields("All fields are required")),
        };

        let submission = ContactSubmission {
            id: Uuid::new_v4(),
            name,
            email: checked_email(email)?,
            subject,
            message,
            timestamp: client_timestamp(form.timestamp.as_deref()),
            ip,
            status: LeadStatus::Unread,
        };

        info!("New contact form from {}", submission.email);
        push_bounded(&self.contacts, submission.clone(), self.capacity, "contacts");
        Ok(submission)
    }

    pub fn add_consultation(&self, form: ConsultationForm, ip: String) -> Result<ConsultationRequest, LeadError> {
        let email = required(&form.email);
        let investment_data = form.investment_data.filter(|data| !data.is_null());
        let (email, investment_data) = match (email, investment_data) {
            (Some(email), Some(data)) => (email, data),
            _ => return Err(LeadError::MissingFields("Email and investment data required")),
        };

        let request = ConsultationRequest {
            id: Uuid::new_v4(),
            email: checked_email(email)?,
            investment_data,
            timestamp: Utc::now(),
            ip,
            status: LeadStatus::Unread,
        };

        info!("New consultation request from {}", request.email);
        push_bounded(&self.consultations, request.clone(), self.capacity, "consultations");
        Ok(request)
    }

    /// Contact submissions, newest first.
    pub fn contacts(&self) -> Vec<ContactSubmission> {
        let mut contacts: Vec<_> = self
            .contacts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();
        contacts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        contacts
    }

    /// Consultation requests, newest first.
    pub fn consultations(&self) -> Vec<ConsultationRequest> {
        let mut requests: Vec<_> = self
            .consultations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(name: &str, email: &str, timestamp: Option<&str>) -> ContactForm {
        ContactForm {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            subject: Some("Retirement".to_string()),
            message: Some("Call me".to_string()),
            timestamp: timestamp.map(str::to_string),
        }
    }

    #[test]
    fn test_contact_requires_all_fields() {
        let store = LeadStore::with_capacity(DEFAULT_LEAD_CAPACITY);
        let mut incomplete = form("Ada", "ada@example.com", None);
        incomplete.subject = Some("   ".to_string());
        assert_eq!(
            store.add_contact(incomplete, "127.0.0.1".to_string()),
            Err(LeadError::MissingFields("All fields are required"))
        );
        assert!(store.contacts().is_empty());
    }

    #[test]
    fn test_contact_rejects_bad_email() {
        let store = LeadStore::with_capacity(DEFAULT_LEAD_CAPACITY);
        let err = store.add_contact(form("Ada", "not-an-email", None), "ip".to_string());
        assert!(matches!(err, Err(LeadError::InvalidEmail(_))));
    }

    #[test]
    fn test_contacts_newest_first() {
        let store = LeadStore::with_capacity(DEFAULT_LEAD_CAPACITY);
        store
            .add_contact(form("Old", "old@example.com", Some("2024-01-01T00:00:00Z")), "a".to_string())
            .unwrap();
        store
            .add_contact(form("New", "new@example.com", Some("2025-06-01T12:00:00Z")), "b".to_string())
            .unwrap();

        let contacts = store.contacts();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name, "New");
        assert_eq!(contacts[1].status, LeadStatus::Unread);
    }

    #[test]
    fn test_store_evicts_oldest_when_full() {
        let store = LeadStore::with_capacity(2);
        for (i, name) in ["First", "Second", "Third"].iter().enumerate() {
            let ts = format!("2025-01-0{}T00:00:00Z", i + 1);
            store
                .add_contact(form(name, "lead@example.com", Some(&ts)), "ip".to_string())
                .unwrap();
        }

        let names: Vec<_> = store.contacts().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Third", "Second"]);

        for _ in 0..3 {
            let request = ConsultationForm {
                email: Some("lead@example.com".to_string()),
                investment_data: Some(json!({"amount": 1})),
            };
            store.add_consultation(request, "ip".to_string()).unwrap();
        }
        assert_eq!(store.consultations().len(), 2);
    }

    #[test]
    fn test_consultation_needs_investment_data() {
        let store = LeadStore::with_capacity(DEFAULT_LEAD_CAPACITY);
        let missing = ConsultationForm {
            email: Some("ada@example.com".to_string()),
            investment_data: Some(serde_json::Value::Null),
        };
        assert!(store.add_consultation(missing, "ip".to_string()).is_err());

        let ok = ConsultationForm {
            email: Some("ada@example.com".to_string()),
            investment_data: Some(json!({"amount": 10000, "targetYear": 2040})),
        };
        let saved = store.add_consultation(ok, "ip".to_string()).unwrap();
        assert_eq!(saved.investment_data["targetYear"], 2040);
        assert_eq!(store.consultations().len(), 1);
    }
}
