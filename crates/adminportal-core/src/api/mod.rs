//! Auth API boundary.
//!
//! All HTTP traffic goes through `ApiClient`. The session store and the
//! view-models depend on the `AuthApi` / `SupportApi` traits instead.

mod client;
mod error;
mod support;
mod types;

pub use client::{ApiClient, AuthApi};
pub use error::AuthError;
pub use support::SupportApi;
pub use types::{Credentials, Outcome, RegisterRequest, RegisteredUser, RegistrationResult};
