//! API-facing (JSON de/serialisable) types.

pub mod auth;
pub mod credentials;
pub mod requests;
pub mod views;
