// src/handlers/mod.rs
pub mod error;
pub mod forecast;
pub mod health;
pub mod leads;
pub mod market;
