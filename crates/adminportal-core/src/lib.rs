//! Core library for the admin portal front-end.
//!
//! This crate holds everything below the presentation layer:
//! - `api`: HTTP client for the Auth API and support endpoints
//! - `storage`: durable/ephemeral token and profile persistence
//! - `session`: session state, reducer and the store that drives it
//! - `forms`: per-form view-models (login, register, password recovery)
//! - `guard`: route access decisions
//! - `validation`: client-side field and form validation
//! - `support`: support-ticket and feedback forms

pub mod api;
pub mod config;
pub mod forms;
pub mod guard;
pub mod models;
pub mod session;
pub mod storage;
pub mod support;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, AuthApi, AuthError, SupportApi};
pub use config::Config;
pub use guard::{guard, Navigation, Route};
pub use models::{TokenPair, UserProfile};
pub use session::{Session, SessionAction, SessionStore};
pub use storage::{AuthStorage, Scope};
