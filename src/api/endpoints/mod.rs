//! HTTP endpoint handlers. Thin: decode, check out a connection, call the
//! domain module, shape the response.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod doctor;
pub mod health;
pub mod health_metrics;
pub mod patient;
